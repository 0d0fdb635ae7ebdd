// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory item store
//!
//! The store keeps semi-structured records keyed by
//! `(project, kind, id)`.  Both the operation subsystem and the ordinary
//! resource APIs persist through this interface; a real deployment would
//! swap in a durable backend satisfying the same contract.
//!
//! `item_update` is the only read-modify-write primitive.  The operation
//! manager's lazy status refresh runs through it, so two concurrent reads
//! of the same operation serialize their merges here rather than racing.

pub mod model;

use gce_bridge_common::api::CreateResult;
use gce_bridge_common::api::DeleteResult;
use gce_bridge_common::api::Error;
use gce_bridge_common::api::InternalContext;
use gce_bridge_common::api::ListResultVec;
use gce_bridge_common::api::LookupResult;
use gce_bridge_common::api::UpdateResult;
use model::Record;
use std::collections::BTreeMap;
use std::sync::Mutex;

type ItemKey = (String, &'static str, String);

pub struct DataStore {
    items: Mutex<BTreeMap<ItemKey, serde_json::Value>>,
}

impl DataStore {
    pub fn new() -> DataStore {
        DataStore { items: Mutex::new(BTreeMap::new()) }
    }

    fn key<T: Record>(project: &str, id: &str) -> ItemKey {
        (String::from(project), T::KIND, String::from(id))
    }

    /// Persists a new record.  The record's id must not already be in use;
    /// name uniqueness (which is scoped) is the resource APIs' concern.
    pub fn item_create<T: Record>(
        &self,
        project: &str,
        item: &T,
    ) -> CreateResult<T> {
        let key = Self::key::<T>(project, &item.record_id());
        let value = serde_json::to_value(item)?;
        let mut items = self.items.lock().unwrap();
        if items.contains_key(&key) {
            return Err(Error::ObjectAlreadyExists {
                type_name: T::RESOURCE_TYPE,
                object_name: String::from(item.record_name()),
            });
        }
        items.insert(key, value);
        Ok(item.clone())
    }

    pub fn item_get_by_id<T: Record>(
        &self,
        project: &str,
        id: &str,
    ) -> LookupResult<Option<T>> {
        let items = self.items.lock().unwrap();
        match items.get(&Self::key::<T>(project, id)) {
            None => Ok(None),
            Some(value) => Ok(Some(deserialize::<T>(value)?)),
        }
    }

    /// Looks a record up by display name.  Names are not part of the
    /// storage key; finding more than one match is reported rather than
    /// silently picking one.  Scoped resources (whose names are only unique
    /// per scope) must filter a listing instead.
    pub fn item_get_by_name<T: Record>(
        &self,
        project: &str,
        name: &str,
    ) -> LookupResult<Option<T>> {
        let matches = self
            .items_list::<T>(project)?
            .into_iter()
            .filter(|item| item.record_name() == name)
            .collect::<Vec<T>>();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            n => Err(Error::internal_error(&format!(
                "found {} {} records named \"{}\"",
                n,
                T::RESOURCE_TYPE,
                name
            ))),
        }
    }

    pub fn items_list<T: Record>(&self, project: &str) -> ListResultVec<T> {
        let items = self.items.lock().unwrap();
        items
            .iter()
            .filter(|((p, kind, _), _)| p == project && *kind == T::KIND)
            .map(|(_, value)| deserialize::<T>(value))
            .collect()
    }

    pub fn item_delete<T: Record>(
        &self,
        project: &str,
        id: &str,
    ) -> DeleteResult {
        let mut items = self.items.lock().unwrap();
        match items.remove(&Self::key::<T>(project, id)) {
            Some(_) => Ok(()),
            None => Err(Error::not_found_by_id(T::RESOURCE_TYPE, id)),
        }
    }

    /// Atomically applies `update` to the record with the given id,
    /// persisting and returning the result.  The store lock is held across
    /// the whole read-modify-write, so concurrent updates of the same
    /// record serialize.
    pub fn item_update<T, F>(
        &self,
        project: &str,
        id: &str,
        update: F,
    ) -> UpdateResult<T>
    where
        T: Record,
        F: FnOnce(&mut T) -> Result<(), Error>,
    {
        let key = Self::key::<T>(project, id);
        let mut items = self.items.lock().unwrap();
        let value = items
            .get(&key)
            .ok_or_else(|| Error::not_found_by_id(T::RESOURCE_TYPE, id))?;
        let mut item = deserialize::<T>(value)?;
        update(&mut item)?;
        items.insert(key, serde_json::to_value(&item)?);
        Ok(item)
    }
}

fn deserialize<T: Record>(value: &serde_json::Value) -> Result<T, Error> {
    serde_json::from_value::<T>(value.clone())
        .map_err(Error::from)
        .with_internal_context(|| {
            format!("deserializing stored {} record", T::RESOURCE_TYPE)
        })
}
