// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The scope model: where a resource or a list query is anchored
//!
//! Every resource in the GCE API lives in exactly one scope: the global
//! collection, a named zone, or a named region.  A fourth pseudo-scope,
//! `aggregated`, exists only as a list-request modifier that fans a query
//! out across all zones or regions; it is never attached to a stored
//! record.

use crate::api::Error;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FormatResult;

/// The locality qualifier of a resource or list query
///
/// A `Scope` is a pure value: it is constructed per-request from the URL
/// path (or read back from a stored record's denormalized copy) and has no
/// lifecycle of its own.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Zone(String),
    Region(String),
    Aggregated,
}

impl Scope {
    /// Returns the wire name of the scope kind
    pub fn kind(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Zone(_) => "zone",
            Scope::Region(_) => "region",
            Scope::Aggregated => "aggregated",
        }
    }

    /// Returns the scope's name, if it has one
    pub fn name(&self) -> Option<&str> {
        match self {
            Scope::Zone(name) | Scope::Region(name) => Some(name),
            Scope::Global | Scope::Aggregated => None,
        }
    }

    /// Returns the URL path segment(s) addressing this scope: the
    /// pluralized collection plus the name for named scopes
    /// (`"zones/nova"`), or just the kind for the unnamed ones
    pub fn path(&self) -> String {
        match self {
            Scope::Global => String::from("global"),
            Scope::Aggregated => String::from("aggregated"),
            Scope::Zone(name) => format!("zones/{}", name),
            Scope::Region(name) => format!("regions/{}", name),
        }
    }

    pub fn is_aggregated(&self) -> bool {
        matches!(self, Scope::Aggregated)
    }

    /// Parses the scope out of a project-relative resource path of the form
    /// `<project>/<scope...>/<collection>[/<name>]`.
    ///
    /// Returns `InvalidRequest` for paths with fewer than three segments,
    /// an unknown scope marker, or a `zones`/`regions` collection with no
    /// id supplied.
    pub fn from_path(path: &str) -> Result<Scope, Error> {
        let segments: Vec<&str> =
            path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 3 {
            return Err(Error::invalid_request(&format!(
                "malformed resource path \"{}\"",
                path
            )));
        }
        let (scope, _) = scope_from_segments(&segments[1..], path)?;
        Ok(scope)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "{}", self.path())
    }
}

/// Reads a scope from the front of `segments`, returning it along with the
/// number of segments consumed (one for `global`/`aggregated`, two for
/// `zones/<id>` and `regions/<id>`).
fn scope_from_segments<'a>(
    segments: &[&'a str],
    path: &str,
) -> Result<(Scope, usize), Error> {
    match segments {
        ["global", ..] => Ok((Scope::Global, 1)),
        ["aggregated", ..] => Ok((Scope::Aggregated, 1)),
        ["zones", id, ..] => Ok((Scope::Zone(String::from(*id)), 2)),
        ["regions", id, ..] => Ok((Scope::Region(String::from(*id)), 2)),
        _ => Err(Error::invalid_request(&format!(
            "malformed resource path \"{}\"",
            path
        ))),
    }
}

/// Parses a resource URL of the kind that appears in request bodies (e.g.
/// an `attachDisk` source or a firewall's `network` field) into its scope,
/// collection, and resource name.
///
/// Accepts fully-qualified URLs
/// (`http://host/compute/v1/projects/p/zones/z/disks/d`),
/// project-relative paths (`p/zones/z/disks/d`), and scope-relative paths
/// (`global/networks/default`).
pub fn parse_resource_url(
    url: &str,
) -> Result<(Scope, String, String), Error> {
    // Strip any scheme/host and any leading "[compute/v1/]projects/" prefix.
    let path = match url.find("/projects/") {
        Some(index) => &url[index + "/projects/".len()..],
        None => url.strip_prefix("projects/").unwrap_or(url),
    };
    let segments: Vec<&str> =
        path.split('/').filter(|s| !s.is_empty()).collect();

    // A scope-relative path starts directly with the scope marker; a
    // project-relative path has the project first.
    let rest = match segments.first() {
        Some(&"global") | Some(&"aggregated") | Some(&"zones")
        | Some(&"regions") => &segments[..],
        Some(_) => &segments[1..],
        None => &[],
    };

    let malformed = || {
        Error::invalid_request(&format!("malformed resource url \"{}\"", url))
    };

    let (scope, consumed) = match rest.first() {
        Some(_) => scope_from_segments(rest, url)?,
        None => return Err(malformed()),
    };
    if scope.is_aggregated() {
        // Aggregated is a list-request modifier; it can never address an
        // individual resource.
        return Err(malformed());
    }
    match &rest[consumed..] {
        [collection, name] => {
            Ok((scope, String::from(*collection), String::from(*name)))
        }
        _ => Err(malformed()),
    }
}
