use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "scan": {
                "type": "object",
                "properties": {
                    "role_name": { "type": "string", "minLength": 1 },
                    "session_name": { "type": "string", "minLength": 2, "maxLength": 64 },
                    "credential_duration_secs": { "type": "integer", "minimum": 900, "maximum": 43200 },
                    "regions": { "type": "array", "items": { "type": "string" } },
                    "max_region_workers": { "type": "integer", "minimum": 1 },
                    "account_concurrency": { "type": "integer", "minimum": 1 },
                    "call_timeout_secs": { "type": "integer", "minimum": 1 },
                    "region_timeout_secs": { "type": "integer", "minimum": 1 },
                    "max_credential_retries": { "type": "integer", "minimum": 0, "maximum": 10 },
                    "params": { "type": "object" }
                }
            },
            "jobs": {
                "type": "object",
                "properties": {
                    "ttl_secs": { "type": "integer", "minimum": 0 },
                    "max_jobs": { "type": "integer", "minimum": 1 },
                    "reap_interval_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "server": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                    "api_key": { "type": "string" },
                    "cors_origins": { "type": "array", "items": { "type": "string" } },
                    "rate_limit_per_minute": { "type": "integer", "minimum": 0 },
                    "rate_limit_burst": { "type": "integer", "minimum": 1 }
                }
            },
            "inventory": {
                "type": "object",
                "required": ["management_account_id"],
                "properties": {
                    "management_account_id": { "type": "string", "pattern": "^[0-9]{12}$" },
                    "regions": { "type": "array", "items": { "type": "string" } },
                    "organizational_units": { "type": "array", "items": { "$ref": "#/$defs/unit" } },
                    "denied_accounts": { "type": "array", "items": { "type": "string" } }
                }
            },
            "fixtures": {
                "type": "array",
                "items": { "$ref": "#/$defs/fixture" }
            }
        },
        "$defs": {
            "unit": {
                "type": "object",
                "required": ["name", "id"],
                "properties": {
                    "name": { "type": "string" },
                    "id": { "type": "string" },
                    "accounts": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["id", "name"],
                            "properties": {
                                "id": { "type": "string" },
                                "name": { "type": "string" },
                                "status": { "type": "string", "enum": ["ACTIVE", "SUSPENDED", "PENDING_CLOSURE"] }
                            }
                        }
                    }
                }
            },
            "fixture": {
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": { "type": "string", "pattern": "^[a-z0-9][a-z0-9-]*$" },
                    "description": { "type": "string" },
                    "failing_regions": { "type": "array", "items": { "type": "string" } },
                    "latency_ms": { "type": "integer", "minimum": 0 },
                    "findings": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["region", "title", "severity"],
                            "properties": {
                                "account_id": { "type": "string" },
                                "region": { "type": "string" },
                                "title": { "type": "string" },
                                "severity": { "type": "string", "enum": ["critical", "high", "medium", "low", "info"] },
                                "description": { "type": "string" },
                                "resource_id": { "type": "string" },
                                "monthly_impact": { "type": "number", "minimum": 0 },
                                "recommended_action": { "type": "string" },
                                "metadata": { "type": "object" }
                            }
                        }
                    }
                }
            }
        }
    })
});
