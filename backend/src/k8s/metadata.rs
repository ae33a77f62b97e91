//! Labels and annotations stamped on every object the backend creates

use std::collections::BTreeMap;

use crate::models::ContainerSpec;

/// Marker label present on everything managed by the backend
pub const MANAGED_LABEL: &str = "kubedock";
/// Label carrying the container short id; the only pod lookup key
pub const CONTAINER_ID_LABEL: &str = "kubedock.containerid";
/// Label carrying the (sanitized) container name
pub const CONTAINER_NAME_LABEL: &str = "kubedock.containername";
/// Annotation carrying the full container id
pub const CONTAINER_FULL_ID_ANNOTATION: &str = "kubedock.id";

const MAX_LABEL_VALUE_LEN: usize = 63;

/// Create the management labels for a container.
///
/// Always exactly three entries; user labels never end up here.
pub fn get_labels(spec: &ContainerSpec) -> BTreeMap<String, String> {
    [
        (MANAGED_LABEL.to_string(), "true".to_string()),
        (CONTAINER_ID_LABEL.to_string(), spec.short_id.clone()),
        (
            CONTAINER_NAME_LABEL.to_string(),
            sanitize_label_value(&spec.name),
        ),
    ]
    .into_iter()
    .collect()
}

/// Selector labels tying a Deployment/Service to the container's pods
pub fn selector_labels(spec: &ContainerSpec) -> BTreeMap<String, String> {
    [(CONTAINER_ID_LABEL.to_string(), spec.short_id.clone())]
        .into_iter()
        .collect()
}

/// Create the annotations for a container: the user labels passed through
/// plus the management annotation, which wins on a key clash.
pub fn get_annotations(spec: &ContainerSpec) -> BTreeMap<String, String> {
    let mut annotations = spec.labels.clone();
    annotations.insert(CONTAINER_FULL_ID_ANNOTATION.to_string(), spec.id.clone());
    annotations
}

/// Make a string acceptable as a label value: at most 63 characters of
/// `[A-Za-z0-9-_.]`, starting and ending alphanumeric.
pub fn sanitize_label_value(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let truncated: String = trimmed.chars().take(MAX_LABEL_VALUE_LEN).collect();
    truncated
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_labels_count_is_fixed() {
        let spec = ContainerSpec::default();
        assert_eq!(get_labels(&spec).len(), 3);

        let spec = ContainerSpec {
            labels: [("computer".to_string(), "msx".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let labels = get_labels(&spec);
        assert_eq!(labels.len(), 3);
        assert!(!labels.contains_key("computer"));
    }

    #[test]
    fn test_get_labels_values() {
        let spec = ContainerSpec {
            short_id: "tr808".to_string(),
            name: "/f1spirit".to_string(),
            ..Default::default()
        };
        let labels = get_labels(&spec);
        assert_eq!(labels.get(MANAGED_LABEL), Some(&"true".to_string()));
        assert_eq!(labels.get(CONTAINER_ID_LABEL), Some(&"tr808".to_string()));
        assert_eq!(
            labels.get(CONTAINER_NAME_LABEL),
            Some(&"f1spirit".to_string())
        );
    }

    #[test]
    fn test_get_annotations_count() {
        let spec = ContainerSpec::default();
        assert_eq!(get_annotations(&spec).len(), 1);

        let spec = ContainerSpec {
            id: "rc752".to_string(),
            labels: [("computer".to_string(), "msx".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let annotations = get_annotations(&spec);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations.get("computer"), Some(&"msx".to_string()));
        assert_eq!(
            annotations.get(CONTAINER_FULL_ID_ANNOTATION),
            Some(&"rc752".to_string())
        );
    }

    #[test]
    fn test_sanitize_label_value() {
        assert_eq!(sanitize_label_value("/f1spirit"), "f1spirit");
        assert_eq!(sanitize_label_value("my app!"), "my-app");
        assert_eq!(sanitize_label_value(""), "");
        assert_eq!(sanitize_label_value(&"a".repeat(80)).len(), 63);
        assert_eq!(sanitize_label_value(&format!("{}-b", "a".repeat(62))), "a".repeat(62));
    }
}
