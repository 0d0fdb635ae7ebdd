// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types shared by every component of the GCE bridge
//!
//! This crate holds the HTTP-agnostic pieces of the API surface: the error
//! taxonomy, the value types describing resources and operations, and the
//! scope model used to anchor resources to a zone, a region, or the global
//! collection.

pub mod api;
