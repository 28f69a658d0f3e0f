//! In-memory network inventory exposed as tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use toolhost::primitives::{self, FieldKind, InputSchema, ToolName};
use toolhost::registry::{Arguments, ToolError, ToolHandler, ToolRegistry, ToolResult};
use tracing::debug;
use uuid::Uuid;

const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
const CLUSTER_ARN_PREFIX: &str = "arn:aws:ecs:local:000000000000:cluster/";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Vpc {
    vpc_id: String,
    cidr_block: String,
    state: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Subnet {
    subnet_id: String,
    vpc_id: String,
    cidr_block: String,
    availability_zone: String,
    state: &'static str,
}

#[derive(Debug, Default)]
struct State {
    vpcs: BTreeMap<String, Vpc>,
    subnets: BTreeMap<String, Subnet>,
    clusters: Vec<String>,
}

/// Shared inventory backing every tool.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    state: Arc<RwLock<State>>,
}

fn short_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &simple[..17])
}

impl Inventory {
    async fn create_vpc(&self, args: Arguments) -> ToolResult<Value> {
        let cidr = args.str_or("cidr", DEFAULT_VPC_CIDR)?;
        let vpc = Vpc {
            vpc_id: short_id("vpc"),
            cidr_block: cidr.to_owned(),
            state: "available",
        };
        debug!(vpc_id = %vpc.vpc_id, cidr, "created vpc");
        let reply = json!({ "VpcId": vpc.vpc_id, "CidrBlock": vpc.cidr_block, "State": vpc.state });
        self.state.write().await.vpcs.insert(vpc.vpc_id.clone(), vpc);
        Ok(reply)
    }

    async fn delete_vpc(&self, args: Arguments) -> ToolResult<Value> {
        let vpc_id = args.require_str("vpc_id")?;
        let mut state = self.state.write().await;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(ToolError::execution(format!("VPC `{vpc_id}` does not exist")));
        }
        if state.subnets.values().any(|subnet| subnet.vpc_id == vpc_id) {
            return Err(ToolError::execution(format!(
                "VPC `{vpc_id}` has dependencies and cannot be deleted"
            )));
        }
        state.vpcs.remove(vpc_id);
        Ok(json!({ "message": format!("Deleted VPC {vpc_id}") }))
    }

    async fn list_vpcs(&self) -> ToolResult<Value> {
        let state = self.state.read().await;
        Ok(json!({ "Vpcs": state.vpcs.values().collect::<Vec<_>>() }))
    }

    async fn create_subnet(&self, args: Arguments) -> ToolResult<Value> {
        let vpc_id = args.require_str("vpc_id")?;
        let cidr = args.require_str("cidr")?;
        let az = args.require_str("az")?;

        let mut state = self.state.write().await;
        if !state.vpcs.contains_key(vpc_id) {
            return Err(ToolError::execution(format!("VPC `{vpc_id}` does not exist")));
        }
        let subnet = Subnet {
            subnet_id: short_id("subnet"),
            vpc_id: vpc_id.to_owned(),
            cidr_block: cidr.to_owned(),
            availability_zone: az.to_owned(),
            state: "available",
        };
        let reply = json!({ "SubnetId": subnet.subnet_id, "State": subnet.state });
        state.subnets.insert(subnet.subnet_id.clone(), subnet);
        Ok(reply)
    }

    async fn list_subnets(&self) -> ToolResult<Value> {
        let state = self.state.read().await;
        Ok(json!({ "Subnets": state.subnets.values().collect::<Vec<_>>() }))
    }

    async fn create_cluster(&self, args: Arguments) -> ToolResult<Value> {
        let name = args.require_str("name")?;
        if name.trim().is_empty() {
            return Err(ToolError::invalid("name", "must not be blank"));
        }
        let arn = format!("{CLUSTER_ARN_PREFIX}{name}");
        let mut state = self.state.write().await;
        if state.clusters.contains(&arn) {
            return Err(ToolError::execution(format!("cluster `{name}` already exists")));
        }
        state.clusters.push(arn.clone());
        Ok(json!({ "ClusterArn": arn }))
    }

    async fn list_clusters(&self) -> ToolResult<Value> {
        Ok(json!({ "Clusters": self.state.read().await.clusters }))
    }
}

/// Returns its `msg` argument unchanged.
struct Echo;

#[async_trait]
impl ToolHandler for Echo {
    async fn call(&self, args: Arguments) -> ToolResult<Value> {
        Ok(Value::String(args.require_str("msg")?.to_owned()))
    }
}

fn schema(fields: &[(&str, &str, bool)]) -> primitives::Result<InputSchema> {
    let mut builder = InputSchema::builder();
    for &(name, description, required) in fields {
        builder = if required {
            builder.required(name, FieldKind::String, description)?
        } else {
            builder.optional(name, FieldKind::String, description)?
        };
    }
    Ok(builder.build())
}

macro_rules! inventory_tool {
    ($registry:expr, $inventory:expr, $name:literal, $description:literal, $schema:expr, |$inv:ident, $args:ident| $body:expr) => {{
        let $inv = $inventory.clone();
        $registry.register(
            ToolName::new($name)?,
            move |$args: Arguments| {
                let $inv = $inv.clone();
                async move { $body }
            },
            $description,
            $schema,
        );
    }};
}

/// Builds the demo registry over a fresh inventory.
///
/// # Errors
///
/// Returns the primitives error if a built-in tool name or schema is
/// rejected.
pub fn registry(inventory: &Inventory) -> primitives::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    inventory_tool!(
        registry,
        inventory,
        "create_vpc",
        "Create a VPC with the given CIDR block (default 10.0.0.0/16)",
        schema(&[("cidr", "IPv4 CIDR block", false)])?,
        |inv, args| inv.create_vpc(args).await
    );
    inventory_tool!(
        registry,
        inventory,
        "delete_vpc",
        "Delete a VPC that has no subnets",
        schema(&[("vpc_id", "VPC identifier", true)])?,
        |inv, args| inv.delete_vpc(args).await
    );
    inventory_tool!(
        registry,
        inventory,
        "list_vpcs",
        "List all VPCs",
        InputSchema::empty(),
        |inv, _args| inv.list_vpcs().await
    );
    inventory_tool!(
        registry,
        inventory,
        "create_subnet",
        "Create a subnet inside an existing VPC",
        schema(&[
            ("vpc_id", "VPC identifier", true),
            ("cidr", "IPv4 CIDR block", true),
            ("az", "Availability zone", true),
        ])?,
        |inv, args| inv.create_subnet(args).await
    );
    inventory_tool!(
        registry,
        inventory,
        "list_subnets",
        "List all subnets",
        InputSchema::empty(),
        |inv, _args| inv.list_subnets().await
    );
    inventory_tool!(
        registry,
        inventory,
        "create_cluster",
        "Create a container cluster",
        schema(&[("name", "Cluster name", true)])?,
        |inv, args| inv.create_cluster(args).await
    );
    inventory_tool!(
        registry,
        inventory,
        "list_clusters",
        "List container cluster ARNs",
        InputSchema::empty(),
        |inv, _args| inv.list_clusters().await
    );

    registry.register(
        ToolName::new("echo")?,
        Echo,
        "Echo the msg argument",
        schema(&[("msg", "Message to echo", true)])?,
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolhost::kernel::Dispatcher;

    fn dispatcher() -> Dispatcher {
        let registry = registry(&Inventory::default()).unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    #[test]
    fn catalog_order() {
        let names: Vec<_> = registry(&Inventory::default())
            .unwrap()
            .names()
            .map(str::to_owned)
            .collect();
        assert_eq!(
            names,
            [
                "create_vpc",
                "delete_vpc",
                "list_vpcs",
                "create_subnet",
                "list_subnets",
                "create_cluster",
                "list_clusters",
                "echo"
            ]
        );
    }

    #[tokio::test]
    async fn vpc_lifecycle() {
        let dispatcher = dispatcher();

        let created = dispatcher.call("create_vpc", json!({"region": "ignored"})).await;
        let created = created.into_result().unwrap();
        assert_eq!(created["CidrBlock"], DEFAULT_VPC_CIDR);
        let vpc_id = created["VpcId"].as_str().unwrap().to_owned();
        assert!(vpc_id.starts_with("vpc-"));

        let subnet = dispatcher
            .call(
                "create_subnet",
                json!({"vpc_id": vpc_id, "cidr": "10.0.1.0/24", "az": "local-1a"}),
            )
            .await
            .into_result()
            .unwrap();
        assert!(subnet["SubnetId"].as_str().unwrap().starts_with("subnet-"));

        let blocked = dispatcher.call("delete_vpc", json!({"vpc_id": vpc_id})).await;
        assert!(blocked.error().unwrap().contains("dependencies"));

        let listed = dispatcher.call("list_subnets", json!({})).await.into_result().unwrap();
        assert_eq!(listed["Subnets"][0]["VpcId"], vpc_id.as_str());
        assert_eq!(listed["Subnets"][0]["AvailabilityZone"], "local-1a");
    }

    #[tokio::test]
    async fn delete_requires_known_vpc() {
        let dispatcher = dispatcher();

        let missing = dispatcher.call("delete_vpc", json!({})).await;
        assert_eq!(missing.error(), Some("missing required argument `vpc_id`"));

        let unknown = dispatcher.call("delete_vpc", json!({"vpc_id": "vpc-0"})).await;
        assert_eq!(unknown.error(), Some("VPC `vpc-0` does not exist"));

        let created = dispatcher.call("create_vpc", json!({"cidr": "172.16.0.0/16"})).await;
        let vpc_id = created.into_result().unwrap()["VpcId"].clone();
        let deleted = dispatcher.call("delete_vpc", json!({"vpc_id": vpc_id})).await;
        assert!(deleted.status());
        let vpcs = dispatcher.call("list_vpcs", json!({})).await.into_result().unwrap();
        assert_eq!(vpcs["Vpcs"], json!([]));
    }

    #[tokio::test]
    async fn clusters_are_unique() {
        let dispatcher = dispatcher();

        let first = dispatcher.call("create_cluster", json!({"name": "web"})).await;
        assert_eq!(
            first.data(),
            Some(&json!({"ClusterArn": format!("{CLUSTER_ARN_PREFIX}web")}))
        );
        let second = dispatcher.call("create_cluster", json!({"name": "web"})).await;
        assert_eq!(second.error(), Some("cluster `web` already exists"));

        let listed = dispatcher.call("list_clusters", json!({})).await;
        assert_eq!(listed.data().unwrap()["Clusters"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn rejected_schema_surfaces_as_primitives_error() {
        let err = schema(&[("cidr", "first", false), ("cidr", "again", false)]).unwrap_err();
        assert!(matches!(err, primitives::Error::InvalidSchema { .. }));
        assert!(err.to_string().contains("cidr"));
    }

    #[tokio::test]
    async fn echo_handler_struct() {
        let envelope = dispatcher().call("echo", json!({"msg": "hi", "extra": 1})).await;
        assert_eq!(envelope.data(), Some(&json!("hi")));
    }
}
