//! 主题清单加载与校验
//!
//! theme.json 位于激活主题目录顶层，是分类词汇表的唯一来源

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::env::constants::MANIFEST_FILE_NAME;
use crate::domain::theme::ThemeManifest;
use crate::error::{ThemeError, ThemeResult};

/// 从主题目录加载并校验 theme.json
pub fn load_manifest(theme_dir: &Path) -> ThemeResult<ThemeManifest> {
    let path = theme_dir.join(MANIFEST_FILE_NAME);
    if !path.exists() {
        return Err(ThemeError::ManifestNotFound { path });
    }

    let raw = fs::read_to_string(&path)?;
    let manifest: ThemeManifest = serde_json::from_str(&raw)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// 校验清单的必填字段和分类约束
pub fn validate_manifest(manifest: &ThemeManifest) -> ThemeResult<()> {
    if manifest.id.is_empty() {
        return Err(ThemeError::ManifestInvalid("theme id is required".to_string()));
    }
    if manifest.name.is_empty() {
        return Err(ThemeError::ManifestInvalid("theme name is required".to_string()));
    }
    if manifest.version.is_empty() {
        return Err(ThemeError::ManifestInvalid(
            "theme version is required".to_string(),
        ));
    }
    if manifest.categories.is_empty() {
        return Err(ThemeError::ManifestInvalid(
            "at least one category is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, category) in manifest.categories.iter().enumerate() {
        if category.id.is_empty() {
            return Err(ThemeError::ManifestInvalid(format!(
                "category {}: id is required",
                index
            )));
        }
        if !seen.insert(category.id.as_str()) {
            return Err(ThemeError::ManifestInvalid(format!(
                "duplicate category id: {}",
                category.id
            )));
        }
        if category.label.is_empty() {
            return Err(ThemeError::ManifestInvalid(format!(
                "category {}: label is required",
                category.id
            )));
        }
        if category.description.is_empty() {
            return Err(ThemeError::ManifestInvalid(format!(
                "category {}: description is required",
                category.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, body: &str) {
        fs::write(dir.join(MANIFEST_FILE_NAME), body).unwrap();
    }

    const VALID: &str = r#"{
        "id": "acme-roadmap",
        "name": "Acme Roadmap",
        "version": "1.2.0",
        "categories": [
            {"id": "feedback", "label": "Feedback", "description": "User feedback"},
            {"id": "released", "label": "Released", "description": "Shipped work"}
        ]
    }"#;

    #[test]
    fn test_load_valid_manifest() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), VALID);

        let manifest = load_manifest(dir.path()).unwrap();
        assert_eq!(manifest.id, "acme-roadmap");
        assert_eq!(manifest.categories.len(), 2);
    }

    #[test]
    fn test_missing_manifest_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_manifest(dir.path()),
            Err(ThemeError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "{not json");
        assert!(matches!(
            load_manifest(dir.path()),
            Err(ThemeError::ManifestParse(_))
        ));
    }

    #[test]
    fn test_zero_categories_rejected() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            r#"{"id": "a", "name": "A", "version": "1.0.0", "categories": []}"#,
        );

        let err = load_manifest(dir.path()).unwrap_err();
        assert!(err.to_string().contains("at least one category"));
    }

    #[test]
    fn test_duplicate_category_ids_rejected() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            r#"{
                "id": "a", "name": "A", "version": "1.0.0",
                "categories": [
                    {"id": "feedback", "label": "Feedback", "description": "x"},
                    {"id": "feedback", "label": "Again", "description": "y"}
                ]
            }"#,
        );

        let err = load_manifest(dir.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate category id: feedback"));
    }

    #[test]
    fn test_missing_category_label_rejected() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            r#"{
                "id": "a", "name": "A", "version": "1.0.0",
                "categories": [{"id": "feedback", "label": "", "description": "x"}]
            }"#,
        );

        let err = load_manifest(dir.path()).unwrap_err();
        assert!(err.to_string().contains("label is required"));
    }
}
