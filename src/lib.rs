// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # typescope
//!
//! A thread-safe runtime type introspection and member access framework for Rust. `typescope`
//! lets a caller read and write fields, invoke methods and constructors, and navigate type
//! hierarchies without compile-time knowledge of the types involved, through two
//! interchangeable access strategies with identical semantics and different performance
//! profiles.
//!
//! ## Features
//!
//! - **Canonical type descriptors** - structural identity for plain and parameterized types
//! - **Hierarchy navigation** - supertype walks, interface DAG traversal, array components
//! - **Nested generic resolution** - chain through generic slots to any depth, erasure tolerant
//! - **Dual access strategies** - universal reflective dispatch, or cached direct-call
//!   trampolines compiled lazily per member signature
//! - **Constructor-bypassing allocation** - produce bare instances with default field values
//! - **Thread safe throughout** - every descriptor and access object is immutable and shareable
//!
//! ## Quick Start
//!
//! Types opt in by implementing [`Reflected`] with a [`TypeBuilder`] registration:
//!
//! ```rust
//! use typescope::{Reflected, TypeBuilder, TypeInfo, Value};
//!
//! #[derive(Default, Clone)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Reflected for Point {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::resolve::<Point>(|| {
//!             TypeBuilder::<Point>::new("Point")
//!                 .allocatable()
//!                 .field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x)
//!                 .field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)
//!                 .method("len_sq", |p: &mut Point| p.x * p.x + p.y * p.y)
//!                 .constructor(|x: i32, y: i32| Point { x, y })
//!                 .build()
//!         })
//!     }
//! }
//!
//! // Same members, either strategy, identical results.
//! let reflective = typescope::reflect::<Point>();
//! let generated = typescope::unreflect::<Point>();
//!
//! let point = reflective
//!     .create(vec![Value::new(3i32), Value::new(4i32)])
//!     .unwrap();
//! let mut point = point.downcast::<Point>().unwrap();
//!
//! let slow = reflective.method("len_sq").unwrap();
//! let fast = generated.method("len_sq").unwrap();
//! assert_eq!(
//!     slow.invoke(Some(&mut point), vec![]).unwrap().downcast::<i32>().unwrap(),
//!     25
//! );
//! assert_eq!(
//!     fast.invoke(Some(&mut point), vec![]).unwrap().downcast::<i32>().unwrap(),
//!     25
//! );
//!
//! // Allocation bypasses every constructor; fields hold their defaults.
//! let bare = Point::type_info().allocate().unwrap().downcast::<Point>().unwrap();
//! assert_eq!((bare.x, bare.y), (0, 0));
//! ```
//!
//! ## Architecture
//!
//! `typescope` is organized into two layers plus shared plumbing:
//!
//! - [`typesystem`] - descriptors, the process-wide registry, registration, primitives
//! - [`access`] - the capability traits, both strategies, and the trampoline cache
//! - [`prelude`] - convenient re-exports of the commonly used types
//! - [`Error`] and [`Result`] - comprehensive error handling
//!
//! ### Strategy Choice
//!
//! The reflective strategy validates and converts arguments against member descriptors on every
//! call and needs no setup. The generated strategy wraps the reflective objects and replaces
//! method invocation with a trampoline compiled on first use, keyed by member signature in a
//! process-wide cache. Semantics never differ between the two; only latency does. A trampoline
//! compilation failure is reported as [`Error::TrampolineCompilation`] rather than silently
//! falling back, so the performance contract stays observable.

pub mod access;
pub mod prelude;
pub mod typesystem;

mod error;
mod value;

pub use error::Error;
pub use value::Value;

/// Result type alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

pub use access::{
    reflect, unreflect, ClassAccess, ClassAccessRc, ConstructorAccess, ConstructorAccessRc,
    FieldAccess, FieldAccessRc, MemberAccess, MethodAccess, MethodAccessRc, Strategy,
};
pub use access::trampoline::{
    DirectCompiler, MemberSignature, Trampoline, TrampolineCache, TrampolineCompiler,
};
pub use typesystem::{
    PrimitiveKind, Reflected, Token, TypeBuilder, TypeInfo, TypeKind, TypeRegistry, Visibility,
};
