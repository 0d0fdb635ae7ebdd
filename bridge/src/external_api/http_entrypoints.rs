// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handler functions (entrypoints) for the external GCE-shaped HTTP API
//!
//! Handlers are thin: parse the request, build an [`OpContext`], call the
//! matching resource API, and render the response envelope.  Every
//! mutating endpoint commits the resource API's pending operation through
//! the operation manager and returns the operation envelope; reads of the
//! operations collection go through the manager's lazy-refresh path.

use super::filter;
use super::params;
use super::views;
use crate::app::base::aggregate;
use crate::app::base::ResourceApi;
use crate::app::operation::PendingOperation;
use crate::context::OpContext;
use crate::context::ServerContext;
use dropshot::endpoint;
use dropshot::ApiDescription;
use dropshot::HttpError;
use dropshot::HttpResponseDeleted;
use dropshot::HttpResponseOk;
use dropshot::Path;
use dropshot::Query;
use dropshot::RequestContext;
use dropshot::TypedBody;
use gce_bridge_common::api::scope::Scope;
use std::sync::Arc;

type BridgeApiDescription = ApiDescription<Arc<ServerContext>>;

/// Returns a description of the external bridge API
pub fn external_api() -> BridgeApiDescription {
    fn register_endpoints(
        api: &mut BridgeApiDescription,
    ) -> Result<(), String> {
        api.register(project_get)?;

        api.register(zones_get)?;
        api.register(zones_get_zone)?;
        api.register(regions_get)?;
        api.register(regions_get_region)?;

        api.register(networks_get)?;
        api.register(networks_post)?;
        api.register(networks_get_network)?;
        api.register(networks_delete_network)?;

        api.register(firewalls_get)?;
        api.register(firewalls_post)?;
        api.register(firewalls_get_firewall)?;
        api.register(firewalls_delete_firewall)?;

        api.register(addresses_get)?;
        api.register(addresses_post)?;
        api.register(addresses_get_address)?;
        api.register(addresses_delete_address)?;
        api.register(addresses_get_aggregated)?;

        api.register(instances_get)?;
        api.register(instances_get_instance)?;
        api.register(instances_get_aggregated)?;
        api.register(instances_instance_reset)?;
        api.register(instances_instance_attach_disk)?;
        api.register(instances_instance_detach_disk)?;
        api.register(instances_instance_add_access_config)?;
        api.register(instances_instance_delete_access_config)?;

        api.register(global_operations_get)?;
        api.register(global_operations_get_operation)?;
        api.register(global_operations_delete_operation)?;
        api.register(zone_operations_get)?;
        api.register(zone_operations_get_operation)?;
        api.register(zone_operations_delete_operation)?;
        api.register(region_operations_get)?;
        api.register(region_operations_get_operation)?;
        api.register(region_operations_delete_operation)?;
        api.register(operations_get_aggregated)?;

        Ok(())
    }

    let mut api = BridgeApiDescription::new();
    if let Err(err) = register_endpoints(&mut api) {
        panic!("failed to register entrypoints: {}", err);
    }
    api
}

/// Commits a pending operation and renders its envelope.
async fn commit_operation(
    apictx: &ServerContext,
    opctx: &OpContext,
    pending: PendingOperation,
) -> Result<views::Operation, HttpError> {
    let operation = apictx.bridge.operations.commit(opctx, pending).await?;
    Ok(views::Operation::new(
        &operation,
        &apictx.link_context(&opctx.project),
    ))
}

/*
 * Projects, zones, regions
 */

/// Fetch the project
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}",
}]
async fn project_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
) -> Result<HttpResponseOk<views::Project>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let project = apictx.bridge.projects.get(&opctx).await?;
    Ok(HttpResponseOk(views::Project::new(
        &project,
        &apictx.link_context(&path.project),
    )))
}

/// List zones
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/zones",
}]
async fn zones_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Zone>>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let zones = apictx
        .bridge
        .zones
        .get_items(&opctx, &Scope::Global)
        .await?
        .iter()
        .map(|zone| views::Zone::new(zone, &lctx))
        .collect();
    Ok(HttpResponseOk(views::ResourceList::new(
        "compute#zoneList",
        filter::apply(zones, query.filter.as_deref()),
    )))
}

/// Fetch a zone
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/zones/{zone}",
}]
async fn zones_get_zone(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ZonePathParam>,
) -> Result<HttpResponseOk<views::Zone>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let zone = apictx
        .bridge
        .zones
        .get_item(&opctx, &path.zone, &Scope::Global)
        .await?;
    Ok(HttpResponseOk(views::Zone::new(
        &zone,
        &apictx.link_context(&path.project),
    )))
}

/// List regions
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/regions",
}]
async fn regions_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Region>>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let regions = apictx
        .bridge
        .regions
        .get_items(&opctx, &Scope::Global)
        .await?
        .iter()
        .map(|region| views::Region::new(region, &lctx))
        .collect();
    Ok(HttpResponseOk(views::ResourceList::new(
        "compute#regionList",
        filter::apply(regions, query.filter.as_deref()),
    )))
}

/// Fetch a region
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/regions/{region}",
}]
async fn regions_get_region(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionPathParam>,
) -> Result<HttpResponseOk<views::Region>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let region = apictx
        .bridge
        .regions
        .get_item(&opctx, &path.region, &Scope::Global)
        .await?;
    Ok(HttpResponseOk(views::Region::new(
        &region,
        &apictx.link_context(&path.project),
    )))
}

/*
 * Networks
 */

/// List networks
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/global/networks",
}]
async fn networks_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Network>>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let networks = apictx
        .bridge
        .networks
        .get_items(&opctx, &Scope::Global)
        .await?
        .iter()
        .map(|network| views::Network::new(network, &lctx))
        .collect();
    Ok(HttpResponseOk(views::ResourceList::new(
        "compute#networkList",
        filter::apply(networks, query.filter.as_deref()),
    )))
}

/// Create a network
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/global/networks",
}]
async fn networks_post(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    body: TypedBody<params::NetworkCreate>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let pending = apictx
        .bridge
        .networks
        .add_item(&opctx, body.into_inner(), &Scope::Global)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Fetch a network
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/global/networks/{name}",
}]
async fn networks_get_network(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::GlobalItemPathParam>,
) -> Result<HttpResponseOk<views::Network>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let network = apictx
        .bridge
        .networks
        .get_item(&opctx, &path.name, &Scope::Global)
        .await?;
    Ok(HttpResponseOk(views::Network::new(
        &network,
        &apictx.link_context(&path.project),
    )))
}

/// Delete a network
#[endpoint {
    method = DELETE,
    path = "/compute/v1/projects/{project}/global/networks/{name}",
}]
async fn networks_delete_network(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::GlobalItemPathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let pending = apictx
        .bridge
        .networks
        .delete_item(&opctx, &path.name, &Scope::Global)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/*
 * Firewalls
 */

/// List firewalls
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/global/firewalls",
}]
async fn firewalls_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Firewall>>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let firewalls = apictx
        .bridge
        .firewalls
        .get_items(&opctx, &Scope::Global)
        .await?
        .iter()
        .map(|firewall| views::Firewall::new(firewall, &lctx))
        .collect();
    Ok(HttpResponseOk(views::ResourceList::new(
        "compute#firewallList",
        filter::apply(firewalls, query.filter.as_deref()),
    )))
}

/// Create a firewall
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/global/firewalls",
}]
async fn firewalls_post(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    body: TypedBody<params::FirewallCreate>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let pending = apictx
        .bridge
        .firewalls
        .add_item(&opctx, body.into_inner(), &Scope::Global)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Fetch a firewall
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/global/firewalls/{name}",
}]
async fn firewalls_get_firewall(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::GlobalItemPathParam>,
) -> Result<HttpResponseOk<views::Firewall>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let firewall = apictx
        .bridge
        .firewalls
        .get_item(&opctx, &path.name, &Scope::Global)
        .await?;
    Ok(HttpResponseOk(views::Firewall::new(
        &firewall,
        &apictx.link_context(&path.project),
    )))
}

/// Delete a firewall
#[endpoint {
    method = DELETE,
    path = "/compute/v1/projects/{project}/global/firewalls/{name}",
}]
async fn firewalls_delete_firewall(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::GlobalItemPathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let pending = apictx
        .bridge
        .firewalls
        .delete_item(&opctx, &path.name, &Scope::Global)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/*
 * Addresses
 */

/// List addresses in a region
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/regions/{region}/addresses",
}]
async fn addresses_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Address>>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Region(path.region.clone());
    let lctx = apictx.link_context(&path.project);
    let addresses = apictx
        .bridge
        .addresses
        .get_items(&opctx, &scope)
        .await?
        .iter()
        .map(|address| views::Address::new(address, &lctx))
        .collect();
    Ok(HttpResponseOk(views::ResourceList::new(
        "compute#addressList",
        filter::apply(addresses, query.filter.as_deref()),
    )))
}

/// Reserve an address
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/regions/{region}/addresses",
}]
async fn addresses_post(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionPathParam>,
    body: TypedBody<params::AddressCreate>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Region(path.region.clone());
    let pending = apictx
        .bridge
        .addresses
        .add_item(&opctx, body.into_inner(), &scope)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Fetch an address
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/regions/{region}/addresses/{name}",
}]
async fn addresses_get_address(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionItemPathParam>,
) -> Result<HttpResponseOk<views::Address>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Region(path.region.clone());
    let address = apictx
        .bridge
        .addresses
        .get_item(&opctx, &path.name, &scope)
        .await?;
    Ok(HttpResponseOk(views::Address::new(
        &address,
        &apictx.link_context(&path.project),
    )))
}

/// Release an address
#[endpoint {
    method = DELETE,
    path = "/compute/v1/projects/{project}/regions/{region}/addresses/{name}",
}]
async fn addresses_delete_address(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionItemPathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Region(path.region.clone());
    let pending = apictx
        .bridge
        .addresses
        .delete_item(&opctx, &path.name, &scope)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// List addresses across all regions
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/aggregated/addresses",
}]
async fn addresses_get_aggregated(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
) -> Result<HttpResponseOk<views::AggregatedList<views::Address>>, HttpError>
{
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let grouped = aggregate(&*apictx.bridge.addresses, &opctx)
        .await?
        .into_iter()
        .map(|(scope_path, addresses)| {
            (
                scope_path,
                addresses
                    .iter()
                    .map(|address| views::Address::new(address, &lctx))
                    .collect(),
            )
        })
        .collect();
    Ok(HttpResponseOk(views::AggregatedList::new(
        "compute#addressAggregatedList",
        "addresses",
        grouped,
    )))
}

/*
 * Instances
 */

/// List instances in a zone
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances",
}]
async fn instances_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ZonePathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Instance>>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let lctx = apictx.link_context(&path.project);
    let instances = apictx
        .bridge
        .instances
        .get_items(&opctx, &scope)
        .await?
        .iter()
        .map(|instance| views::Instance::new(instance, &lctx))
        .collect();
    Ok(HttpResponseOk(views::ResourceList::new(
        "compute#instanceList",
        filter::apply(instances, query.filter.as_deref()),
    )))
}

/// Fetch an instance
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances/{instance}",
}]
async fn instances_get_instance(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::InstancePathParam>,
) -> Result<HttpResponseOk<views::Instance>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let instance = apictx
        .bridge
        .instances
        .get_item(&opctx, &path.instance, &scope)
        .await?;
    Ok(HttpResponseOk(views::Instance::new(
        &instance,
        &apictx.link_context(&path.project),
    )))
}

/// List instances across all zones
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/aggregated/instances",
}]
async fn instances_get_aggregated(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
) -> Result<HttpResponseOk<views::AggregatedList<views::Instance>>, HttpError>
{
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let grouped = aggregate(&*apictx.bridge.instances, &opctx)
        .await?
        .into_iter()
        .map(|(scope_path, instances)| {
            (
                scope_path,
                instances
                    .iter()
                    .map(|instance| views::Instance::new(instance, &lctx))
                    .collect(),
            )
        })
        .collect();
    Ok(HttpResponseOk(views::AggregatedList::new(
        "compute#instanceAggregatedList",
        "instances",
        grouped,
    )))
}

/// Reset an instance
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances/{instance}/reset",
}]
async fn instances_instance_reset(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::InstancePathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let pending = apictx
        .bridge
        .instances
        .reset(&opctx, &scope, &path.instance)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Attach a disk to an instance
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances/{instance}/attachDisk",
}]
async fn instances_instance_attach_disk(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::InstancePathParam>,
    body: TypedBody<params::AttachedDiskCreate>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let pending = apictx
        .bridge
        .attached_disks
        .attach(&opctx, &scope, &path.instance, body.into_inner())
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Detach a disk from an instance
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances/{instance}/detachDisk",
}]
async fn instances_instance_detach_disk(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::InstancePathParam>,
    query_params: Query<params::DetachDiskQueryParams>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let pending = apictx
        .bridge
        .attached_disks
        .detach(&opctx, &scope, &path.instance, &query.device_name)
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Add an access config to an instance's network interface
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances/{instance}/addAccessConfig",
}]
async fn instances_instance_add_access_config(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::InstancePathParam>,
    query_params: Query<params::AddAccessConfigQueryParams>,
    body: TypedBody<params::AccessConfigCreate>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let pending = apictx
        .bridge
        .instances
        .add_access_config(
            &opctx,
            &scope,
            &path.instance,
            &query.network_interface,
            body.into_inner(),
        )
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/// Remove an access config from an instance's network interface
#[endpoint {
    method = POST,
    path = "/compute/v1/projects/{project}/zones/{zone}/instances/{instance}/deleteAccessConfig",
}]
async fn instances_instance_delete_access_config(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::InstancePathParam>,
    query_params: Query<params::DeleteAccessConfigQueryParams>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let scope = Scope::Zone(path.zone.clone());
    let pending = apictx
        .bridge
        .instances
        .delete_access_config(
            &opctx,
            &scope,
            &path.instance,
            &query.network_interface,
            &query.access_config,
        )
        .await?;
    Ok(HttpResponseOk(commit_operation(apictx, &opctx, pending).await?))
}

/*
 * Operations
 *
 * Reads here are what drive RUNNING operations forward: the manager polls
 * the registered progress function as a side effect of the lookup.
 */

async fn operations_list(
    rqctx: &RequestContext<Arc<ServerContext>>,
    project: &str,
    scope: Scope,
    filter_expression: Option<&str>,
) -> Result<views::ResourceList<views::Operation>, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(rqctx, project);
    let lctx = apictx.link_context(project);
    let operations = apictx
        .bridge
        .operations
        .get_items(&opctx, &scope)
        .await?
        .iter()
        .map(|operation| views::Operation::new(operation, &lctx))
        .collect();
    Ok(views::ResourceList::new(
        "compute#operationList",
        filter::apply(operations, filter_expression),
    ))
}

async fn operations_get_one(
    rqctx: &RequestContext<Arc<ServerContext>>,
    project: &str,
    scope: Scope,
    name: &str,
) -> Result<views::Operation, HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(rqctx, project);
    let operation =
        apictx.bridge.operations.get_item(&opctx, name, &scope).await?;
    Ok(views::Operation::new(&operation, &apictx.link_context(project)))
}

async fn operations_delete_one(
    rqctx: &RequestContext<Arc<ServerContext>>,
    project: &str,
    scope: Scope,
    name: &str,
) -> Result<(), HttpError> {
    let apictx = rqctx.context();
    let opctx = OpContext::for_external_api(rqctx, project);
    apictx.bridge.operations.delete_item(&opctx, name, &scope).await?;
    Ok(())
}

/// List global operations
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/global/operations",
}]
async fn global_operations_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Operation>>, HttpError>
{
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let list = operations_list(
        &rqctx,
        &path.project,
        Scope::Global,
        query.filter.as_deref(),
    )
    .await?;
    Ok(HttpResponseOk(list))
}

/// Fetch a global operation
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/global/operations/{name}",
}]
async fn global_operations_get_operation(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::GlobalItemPathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let path = path_params.into_inner();
    let operation =
        operations_get_one(&rqctx, &path.project, Scope::Global, &path.name)
            .await?;
    Ok(HttpResponseOk(operation))
}

/// Delete a global operation
#[endpoint {
    method = DELETE,
    path = "/compute/v1/projects/{project}/global/operations/{name}",
}]
async fn global_operations_delete_operation(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::GlobalItemPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let path = path_params.into_inner();
    operations_delete_one(&rqctx, &path.project, Scope::Global, &path.name)
        .await?;
    Ok(HttpResponseDeleted())
}

/// List operations in a zone
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/zones/{zone}/operations",
}]
async fn zone_operations_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ZonePathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Operation>>, HttpError>
{
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let list = operations_list(
        &rqctx,
        &path.project,
        Scope::Zone(path.zone.clone()),
        query.filter.as_deref(),
    )
    .await?;
    Ok(HttpResponseOk(list))
}

/// Fetch an operation in a zone
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/zones/{zone}/operations/{name}",
}]
async fn zone_operations_get_operation(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ZoneItemPathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let path = path_params.into_inner();
    let operation = operations_get_one(
        &rqctx,
        &path.project,
        Scope::Zone(path.zone.clone()),
        &path.name,
    )
    .await?;
    Ok(HttpResponseOk(operation))
}

/// Delete an operation in a zone
#[endpoint {
    method = DELETE,
    path = "/compute/v1/projects/{project}/zones/{zone}/operations/{name}",
}]
async fn zone_operations_delete_operation(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ZoneItemPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let path = path_params.into_inner();
    operations_delete_one(
        &rqctx,
        &path.project,
        Scope::Zone(path.zone.clone()),
        &path.name,
    )
    .await?;
    Ok(HttpResponseDeleted())
}

/// List operations in a region
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/regions/{region}/operations",
}]
async fn region_operations_get(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionPathParam>,
    query_params: Query<params::ListQueryParams>,
) -> Result<HttpResponseOk<views::ResourceList<views::Operation>>, HttpError>
{
    let path = path_params.into_inner();
    let query = query_params.into_inner();
    let list = operations_list(
        &rqctx,
        &path.project,
        Scope::Region(path.region.clone()),
        query.filter.as_deref(),
    )
    .await?;
    Ok(HttpResponseOk(list))
}

/// Fetch an operation in a region
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/regions/{region}/operations/{name}",
}]
async fn region_operations_get_operation(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionItemPathParam>,
) -> Result<HttpResponseOk<views::Operation>, HttpError> {
    let path = path_params.into_inner();
    let operation = operations_get_one(
        &rqctx,
        &path.project,
        Scope::Region(path.region.clone()),
        &path.name,
    )
    .await?;
    Ok(HttpResponseOk(operation))
}

/// Delete an operation in a region
#[endpoint {
    method = DELETE,
    path = "/compute/v1/projects/{project}/regions/{region}/operations/{name}",
}]
async fn region_operations_delete_operation(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::RegionItemPathParam>,
) -> Result<HttpResponseDeleted, HttpError> {
    let path = path_params.into_inner();
    operations_delete_one(
        &rqctx,
        &path.project,
        Scope::Region(path.region.clone()),
        &path.name,
    )
    .await?;
    Ok(HttpResponseDeleted())
}

/// List operations across all scopes
#[endpoint {
    method = GET,
    path = "/compute/v1/projects/{project}/aggregated/operations",
}]
async fn operations_get_aggregated(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_params: Path<params::ProjectPathParam>,
) -> Result<HttpResponseOk<views::AggregatedList<views::Operation>>, HttpError>
{
    let apictx = rqctx.context();
    let path = path_params.into_inner();
    let opctx = OpContext::for_external_api(&rqctx, &path.project);
    let lctx = apictx.link_context(&path.project);
    let grouped = apictx
        .bridge
        .operations
        .get_aggregated(&opctx)
        .await?
        .into_iter()
        .map(|(scope_path, operations)| {
            (
                scope_path,
                operations
                    .iter()
                    .map(|operation| views::Operation::new(operation, &lctx))
                    .collect(),
            )
        })
        .collect();
    Ok(HttpResponseOk(views::AggregatedList::new(
        "compute#operationAggregatedList",
        "operations",
        grouped,
    )))
}
