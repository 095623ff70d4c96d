use serde_json::{Map, Value};

use super::defaults;
use crate::backends::BackendType;
use crate::core::errors::ApiError;

const STORAGE_BACKENDS: [&str; 3] = ["json", "sqlite", "memory"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 1, 65_536)?;
        if let Some(remote) = expect_optional_object(embedding, "remote")? {
            validate_required_string_field(remote, "embedding.remote.base_url", "base_url")?;
            validate_required_string_field(remote, "embedding.remote.model", "model")?;
            validate_optional_string_field(remote, "embedding.remote.api_key", "api_key")?;
            validate_u64_field(
                remote,
                "embedding.remote.timeout_secs",
                "timeout_secs",
                1,
                600,
            )?;
        }
    }

    if let Some(light_rag) = expect_optional_object(root, "light_rag")? {
        validate_u64_field(light_rag, "light_rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            light_rag,
            "light_rag.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        validate_f64_field(
            light_rag,
            "light_rag.similarity_threshold",
            "similarity_threshold",
            -1.0,
            1.0,
        )?;

        let chunk_size = light_rag
            .get("chunk_size")
            .and_then(Value::as_u64)
            .unwrap_or(defaults::DEFAULT_CHUNK_SIZE as u64);
        let chunk_overlap = light_rag
            .get("chunk_overlap")
            .and_then(Value::as_u64)
            .unwrap_or(defaults::DEFAULT_CHUNK_OVERLAP as u64);
        if chunk_size <= chunk_overlap {
            return Err(ApiError::InvalidConfig(format!(
                "Invalid config at 'light_rag': chunk_size ({}) must be greater than chunk_overlap ({})",
                chunk_size, chunk_overlap
            )));
        }

        if let Some(storage) = expect_optional_object(light_rag, "storage")? {
            validate_enum_field(
                storage,
                "light_rag.storage.backend",
                "backend",
                &STORAGE_BACKENDS,
            )?;
            validate_optional_string_field(storage, "light_rag.storage.path", "path")?;
        }
    }

    if let Some(selection) = expect_optional_object(root, "selection")? {
        validate_u64_field(
            selection,
            "selection.small_file_bytes",
            "small_file_bytes",
            0,
            u64::MAX,
        )?;
        validate_u64_field(
            selection,
            "selection.large_dataset_records",
            "large_dataset_records",
            0,
            u64::MAX,
        )?;
        validate_f64_field(
            selection,
            "selection.high_latency_ms",
            "high_latency_ms",
            0.0,
            f64::MAX,
        )?;
        validate_u64_field(
            selection,
            "selection.max_failures",
            "max_failures",
            0,
            u32::MAX as u64,
        )?;
        validate_f64_field(
            selection,
            "selection.low_prompt_similarity",
            "low_prompt_similarity",
            0.0,
            1.0,
        )?;
    }

    if let Some(migration) = expect_optional_object(root, "migration")? {
        validate_u64_field(
            migration,
            "migration.tick_interval_ms",
            "tick_interval_ms",
            1,
            60_000,
        )?;
        validate_u64_field(
            migration,
            "migration.retention_secs",
            "retention_secs",
            0,
            30 * 86_400,
        )?;
        validate_f64_field(
            migration,
            "migration.chaos_failure_rate",
            "chaos_failure_rate",
            0.0,
            1.0,
        )?;
        validate_u64_field(
            migration,
            "migration.compatibility_failure_floor",
            "compatibility_failure_floor",
            0,
            100,
        )?;
        validate_u64_field(
            migration,
            "migration.fail_at_progress",
            "fail_at_progress",
            0,
            100,
        )?;
        validate_u64_field(migration, "migration.seed", "seed", 0, u64::MAX)?;
    }

    if let Some(backends) = root.get("backends") {
        let entries = backends
            .as_array()
            .ok_or_else(|| config_type_error("backends", "array"))?;
        for (index, value) in entries.iter().enumerate() {
            let path_prefix = format!("backends[{}]", index);
            let entry = value
                .as_object()
                .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
            validate_required_string_field(entry, &format!("{}.id", path_prefix), "id")?;
            validate_required_string_field(entry, &format!("{}.type", path_prefix), "type")?;
            if let Some(raw_type) = entry.get("type").and_then(Value::as_str) {
                raw_type.parse::<BackendType>().map_err(|_| {
                    ApiError::InvalidConfig(format!(
                        "Invalid config at '{}.type': unknown backend type '{}'",
                        path_prefix, raw_type
                    ))
                })?;
            }
            validate_bool_field(entry, &format!("{}.is_active", path_prefix), "is_active")?;
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "non-negative integer"));
    };
    if number < min || number > max {
        return Err(ApiError::InvalidConfig(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !number.is_finite() || number < min || number > max {
        return Err(ApiError::InvalidConfig(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::InvalidConfig(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::InvalidConfig(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::InvalidConfig(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::InvalidConfig(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::InvalidConfig(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_a_complete_config() {
        let config = json!({
            "server": { "host": "0.0.0.0", "port": 8080, "cors_allowed_origins": ["http://localhost"] },
            "embedding": {
                "dimensions": 768,
                "remote": { "base_url": "http://localhost:1234", "model": "nomic", "timeout_secs": 10 }
            },
            "light_rag": {
                "chunk_size": 256,
                "chunk_overlap": 32,
                "similarity_threshold": 0.0,
                "storage": { "backend": "sqlite", "path": "chunks.db" }
            },
            "selection": { "high_latency_ms": 1500.5, "low_prompt_similarity": 0.25 },
            "migration": { "tick_interval_ms": 50, "chaos_failure_rate": 0.1, "seed": 42 },
            "backends": [{ "id": "prod", "type": "managed", "is_active": false }]
        });
        validate_config(&config).unwrap();
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let config = json!({ "light_rag": { "chunk_size": 100, "chunk_overlap": 100 } });
        assert!(matches!(
            validate_config(&config),
            Err(ApiError::InvalidConfig(_))
        ));

        let config = json!({ "light_rag": { "chunk_size": 40 } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_out_of_range_and_mistyped_values() {
        let cases = [
            json!({ "server": { "port": 0 } }),
            json!({ "server": "localhost" }),
            json!({ "migration": { "chaos_failure_rate": 1.5 } }),
            json!({ "selection": { "low_prompt_similarity": "low" } }),
            json!({ "light_rag": { "storage": { "backend": "redis" } } }),
            json!({ "embedding": { "remote": { "model": "nomic" } } }),
        ];
        for config in cases {
            assert!(validate_config(&config).is_err(), "accepted {}", config);
        }
    }

    #[test]
    fn rejects_unknown_backend_types() {
        let config = json!({ "backends": [{ "id": "es", "type": "elasticsearch" }] });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("backends[0].type"));
    }
}
