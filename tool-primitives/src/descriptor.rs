//! Tool metadata advertised to calling agents.

use serde::{Deserialize, Serialize};

use crate::{InputSchema, ToolName};

/// Name, description, and input schema of one invokable tool.
///
/// Serialized as `{"name": ..., "description": ..., "inputSchema": {...}}`,
/// the shape returned by capability discovery.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: ToolName,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema", default)]
    input_schema: InputSchema,
}

impl ToolDescriptor {
    /// Creates a descriptor. The description is free text and is not validated.
    #[must_use]
    pub fn new(name: ToolName, description: impl Into<String>, input_schema: InputSchema) -> Self {
        Self {
            name,
            description: description.into(),
            input_schema,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        &self.name
    }

    /// Returns the description shown to the calling agent.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared input schema.
    #[must_use]
    pub fn input_schema(&self) -> &InputSchema {
        &self.input_schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldKind;
    use serde_json::json;

    #[test]
    fn serializes_discovery_shape() {
        let schema = InputSchema::builder()
            .optional("cidr", FieldKind::String, "CIDR block, defaults to 10.0.0.0/16")
            .expect("schema")
            .build();
        let descriptor =
            ToolDescriptor::new(ToolName::new("create_vpc").unwrap(), "Create a new VPC", schema);

        let encoded = serde_json::to_value(&descriptor).expect("encode");
        assert_eq!(encoded["name"], "create_vpc");
        assert_eq!(encoded["description"], "Create a new VPC");
        assert_eq!(
            encoded["inputSchema"]["properties"]["cidr"],
            json!({"type": "string", "description": "CIDR block, defaults to 10.0.0.0/16"})
        );
    }

    #[test]
    fn deserializes_without_schema() {
        let descriptor: ToolDescriptor =
            serde_json::from_value(json!({"name": "list_vpcs", "description": "List all VPCs."}))
                .expect("decode");
        assert!(descriptor.input_schema().is_empty());
    }
}
