//! 状态到主题分类的映射引擎
//!
//! 用户定义的状态名是自由文本，主题只认识自己的分类词汇表。
//! 分类建议是确定性的：先查精确匹配表，再按固定顺序扫关键词，
//! 最后落到首个分类兜底。同样的输入永远给出同样的建议。

use std::sync::Arc;

use tracing::info;

use crate::domain::theme::{ThemeCategory, ThemeManifest};
use crate::infra::StatusStore;

/// 精确匹配表（状态名小写全等）
const EXACT_MATCHES: [(&str, &str); 7] = [
    ("feedback", "feedback"),
    ("proposed", "proposed"),
    ("released", "released"),
    ("upcoming", "upcoming"),
    ("in progress", "upcoming"),
    ("backlog", "proposed"),
    ("archived", "released"),
];

/// 关键词规则，按优先级排列，子串包含即命中
const KEYWORD_RULES: [(&str, &[&str]); 4] = [
    (
        "feedback",
        &[
            "feedback",
            "suggestion",
            "suggestions",
            "user feedback",
            "feature request",
        ],
    ),
    (
        "upcoming",
        &[
            "doing",
            "progress",
            "wip",
            "dev",
            "development",
            "building",
            "cours",
            "actuel",
            "en cours",
            "current",
            "in progress",
        ],
    ),
    (
        "released",
        &[
            "done",
            "released",
            "shipped",
            "live",
            "deployed",
            "completed",
            "terminé",
            "publié",
            "fini",
            "sortie",
            "launch",
        ],
    ),
    (
        "proposed",
        &[
            "vote",
            "voting",
            "proposed",
            "idea",
            "proposition",
            "idée",
            "request",
        ],
    ),
];

/// 分类词汇表为空时的兜底分类 id
const FALLBACK_CATEGORY: &str = "feedback";

/// 为状态名建议一个主题分类
///
/// 只会返回词汇表里真实存在的分类 id（词汇表为空时例外，返回兜底值）
pub fn suggest_category(status_name: &str, categories: &[ThemeCategory]) -> String {
    let normalized = status_name.trim().to_lowercase();

    let has_category = |id: &str| categories.iter().any(|c| c.id == id);

    for (name, category_id) in EXACT_MATCHES {
        if normalized == name && has_category(category_id) {
            return category_id.to_string();
        }
    }

    for (category_id, keywords) in KEYWORD_RULES {
        if !has_category(category_id) {
            continue;
        }
        if keywords.iter().any(|kw| normalized.contains(kw)) {
            return category_id.to_string();
        }
    }

    categories
        .first()
        .map(|c| c.id.clone())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}

/// 状态表为空时，从主题分类生成默认状态集
///
/// 每个分类生成一个同名状态并直接建立映射；已有任何状态时不做任何事
pub async fn ensure_default_statuses(
    store: &Arc<dyn StatusStore>,
    theme_id: &str,
    manifest: &ThemeManifest,
) -> anyhow::Result<()> {
    let existing = store.list_statuses().await?;
    if !existing.is_empty() {
        return Ok(());
    }

    for (index, category) in manifest.categories.iter().enumerate() {
        let slug = category.label.to_lowercase().replace(' ', "-");
        let status = store
            .create_status(&category.label, &slug, index as i32)
            .await?;
        store
            .create_mapping(status.id, theme_id, &category.id)
            .await?;
    }

    info!(
        theme_id = %theme_id,
        count = manifest.categories.len(),
        "Seeded default statuses from theme categories"
    );
    Ok(())
}

/// 保证每个状态在当前主题下都有映射
///
/// 已有映射的状态保持不变（用户的手动选择优先）
pub async fn ensure_mappings(
    store: &Arc<dyn StatusStore>,
    theme_id: &str,
    manifest: &ThemeManifest,
) -> anyhow::Result<()> {
    let statuses = store.list_statuses().await?;
    let mut created = 0;

    for status in &statuses {
        if store.find_mapping(status.id, theme_id).await?.is_some() {
            continue;
        }

        let category_id = suggest_category(&status.display_name, &manifest.categories);
        store.create_mapping(status.id, theme_id, &category_id).await?;
        created += 1;
    }

    if created > 0 {
        info!(
            theme_id = %theme_id,
            created = created,
            "Created status category mappings"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::JsonStatusStore;
    use tempfile::TempDir;

    fn category(id: &str) -> ThemeCategory {
        ThemeCategory {
            id: id.to_string(),
            label: id.to_string(),
            description: format!("{} category", id),
            multiple: false,
            order: 0,
        }
    }

    fn standard_categories() -> Vec<ThemeCategory> {
        vec![
            category("feedback"),
            category("proposed"),
            category("upcoming"),
            category("released"),
        ]
    }

    #[test]
    fn test_exact_matches() {
        let cats = standard_categories();
        assert_eq!(suggest_category("Feedback", &cats), "feedback");
        assert_eq!(suggest_category("In Progress", &cats), "upcoming");
        assert_eq!(suggest_category("Backlog", &cats), "proposed");
        assert_eq!(suggest_category("Archived", &cats), "released");
    }

    #[test]
    fn test_keyword_containment() {
        let cats = standard_categories();
        assert_eq!(suggest_category("Currently shipping", &cats), "upcoming");
        assert_eq!(suggest_category("Shipped!", &cats), "released");
        assert_eq!(suggest_category("Community ideas", &cats), "proposed");
        assert_eq!(suggest_category("User Feedback Inbox", &cats), "feedback");
    }

    #[test]
    fn test_keyword_priority_order() {
        let cats = standard_categories();
        // "feedback" 规则先于 "proposed" 规则扫描
        assert_eq!(
            suggest_category("feature request voting", &cats),
            "feedback"
        );
    }

    #[test]
    fn test_french_keywords() {
        let cats = standard_categories();
        assert_eq!(suggest_category("En cours", &cats), "upcoming");
        assert_eq!(suggest_category("Terminé", &cats), "released");
        assert_eq!(suggest_category("Idée", &cats), "proposed");
    }

    #[test]
    fn test_unknown_status_falls_back_to_first_category() {
        let cats = vec![category("alpha"), category("beta")];
        assert_eq!(suggest_category("Mystery Status", &cats), "alpha");
    }

    #[test]
    fn test_missing_target_category_is_skipped() {
        // 词汇表没有 upcoming，"in progress" 继续向后匹配
        let cats = vec![category("released"), category("proposed")];
        assert_eq!(suggest_category("in progress dev", &cats), "released");
    }

    #[test]
    fn test_empty_vocabulary_fallback() {
        assert_eq!(suggest_category("anything", &[]), "feedback");
    }

    fn manifest_with(categories: Vec<ThemeCategory>) -> ThemeManifest {
        ThemeManifest {
            id: "test-theme".to_string(),
            name: "Test".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            author: String::new(),
            settings: Vec::new(),
            categories,
        }
    }

    #[tokio::test]
    async fn test_ensure_default_statuses_seeds_empty_store() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn StatusStore> = Arc::new(JsonStatusStore::new(dir.path()));
        let manifest = manifest_with(vec![category("feedback"), category("released")]);

        ensure_default_statuses(&store, "test-theme", &manifest)
            .await
            .unwrap();

        let statuses = store.list_statuses().await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].slug, "feedback");

        let mapping = store
            .find_mapping(statuses[1].id, "test-theme")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.category_id, "released");
    }

    #[tokio::test]
    async fn test_ensure_default_statuses_skips_nonempty_store() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn StatusStore> = Arc::new(JsonStatusStore::new(dir.path()));
        store.create_status("Custom", "custom", 0).await.unwrap();

        let manifest = manifest_with(standard_categories());
        ensure_default_statuses(&store, "test-theme", &manifest)
            .await
            .unwrap();

        // 已有状态时不播种
        assert_eq!(store.list_statuses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_mappings_preserves_existing() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn StatusStore> = Arc::new(JsonStatusStore::new(dir.path()));

        let mapped = store.create_status("Shipped", "shipped", 0).await.unwrap();
        let unmapped = store.create_status("Voting", "voting", 1).await.unwrap();
        // 用户手动把 Shipped 映到 feedback，引擎不得覆盖
        store
            .create_mapping(mapped.id, "test-theme", "feedback")
            .await
            .unwrap();

        let manifest = manifest_with(standard_categories());
        ensure_mappings(&store, "test-theme", &manifest).await.unwrap();

        let kept = store
            .find_mapping(mapped.id, "test-theme")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.category_id, "feedback");

        let suggested = store
            .find_mapping(unmapped.id, "test-theme")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(suggested.category_id, "proposed");
    }
}
