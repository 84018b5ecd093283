//! Section classifier: maps free-form labels onto the canonical sections.
//!
//! Labels come from an LLM and drift: casing, separators, plurals, and the
//! user's working language all vary. Matching is case-insensitive, treats
//! `-`/`_`/whitespace runs as a single space, and falls back to `misc`.

use quillmind_core::playbook::SectionKey;

/// Alias table. Keys are already normalized (lowercase, single spaces).
const ALIASES: &[(&str, SectionKey)] = &[
    // preferences
    ("preferences", SectionKey::Preferences),
    ("preference", SectionKey::Preferences),
    ("prefs", SectionKey::Preferences),
    ("user preferences", SectionKey::Preferences),
    ("style", SectionKey::Preferences),
    ("style preferences", SectionKey::Preferences),
    ("tone", SectionKey::Preferences),
    ("voice", SectionKey::Preferences),
    ("偏好", SectionKey::Preferences),
    ("喜好", SectionKey::Preferences),
    ("风格", SectionKey::Preferences),
    ("préférences", SectionKey::Preferences),
    ("preferencias", SectionKey::Preferences),
    ("vorlieben", SectionKey::Preferences),
    // project
    ("project", SectionKey::Project),
    ("project facts", SectionKey::Project),
    ("project info", SectionKey::Project),
    ("facts", SectionKey::Project),
    ("setting", SectionKey::Project),
    ("world", SectionKey::Project),
    ("worldbuilding", SectionKey::Project),
    ("characters", SectionKey::Project),
    ("plot", SectionKey::Project),
    ("story", SectionKey::Project),
    ("项目", SectionKey::Project),
    ("设定", SectionKey::Project),
    ("世界观", SectionKey::Project),
    ("人物", SectionKey::Project),
    ("proyecto", SectionKey::Project),
    ("projet", SectionKey::Project),
    ("projekt", SectionKey::Project),
    // workflow
    ("workflow", SectionKey::Workflow),
    ("workflows", SectionKey::Workflow),
    ("process", SectionKey::Workflow),
    ("procedure", SectionKey::Workflow),
    ("steps", SectionKey::Workflow),
    ("habits", SectionKey::Workflow),
    ("routine", SectionKey::Workflow),
    ("工作流", SectionKey::Workflow),
    ("流程", SectionKey::Workflow),
    ("习惯", SectionKey::Workflow),
    ("flujo de trabajo", SectionKey::Workflow),
    ("flux de travail", SectionKey::Workflow),
    ("arbeitsablauf", SectionKey::Workflow),
    // open threads
    ("open threads", SectionKey::OpenThreads),
    ("open thread", SectionKey::OpenThreads),
    ("threads", SectionKey::OpenThreads),
    ("todo", SectionKey::OpenThreads),
    ("todos", SectionKey::OpenThreads),
    ("to do", SectionKey::OpenThreads),
    ("pending", SectionKey::OpenThreads),
    ("open questions", SectionKey::OpenThreads),
    ("questions", SectionKey::OpenThreads),
    ("unresolved", SectionKey::OpenThreads),
    ("follow ups", SectionKey::OpenThreads),
    ("followups", SectionKey::OpenThreads),
    ("待办", SectionKey::OpenThreads),
    ("未决", SectionKey::OpenThreads),
    ("悬念", SectionKey::OpenThreads),
    ("伏笔", SectionKey::OpenThreads),
    ("pendientes", SectionKey::OpenThreads),
    ("en suspens", SectionKey::OpenThreads),
    // misc
    ("misc", SectionKey::Misc),
    ("miscellaneous", SectionKey::Misc),
    ("other", SectionKey::Misc),
    ("general", SectionKey::Misc),
    ("notes", SectionKey::Misc),
    ("其他", SectionKey::Misc),
    ("杂项", SectionKey::Misc),
    ("otros", SectionKey::Misc),
    ("divers", SectionKey::Misc),
];

/// Resolve a raw section label to its canonical key. Total: never fails.
pub fn classify(raw_label: &str) -> SectionKey {
    let label = normalize_label(raw_label);
    if label.is_empty() {
        return SectionKey::Misc;
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == label)
        .map(|(_, key)| *key)
        .unwrap_or(SectionKey::Misc)
}

fn normalize_label(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_keys_map_to_themselves() {
        for key in SectionKey::ALL {
            assert_eq!(classify(key.as_str()), key);
        }
    }

    #[test]
    fn case_and_whitespace_are_ignored() {
        assert_eq!(classify("  PREFERENCES "), SectionKey::Preferences);
        assert_eq!(classify("Open Threads"), SectionKey::OpenThreads);
        assert_eq!(classify("open-threads"), SectionKey::OpenThreads);
        assert_eq!(classify("Project_Facts"), SectionKey::Project);
    }

    #[test]
    fn multilingual_aliases() {
        assert_eq!(classify("偏好"), SectionKey::Preferences);
        assert_eq!(classify("世界观"), SectionKey::Project);
        assert_eq!(classify("Flujo de trabajo"), SectionKey::Workflow);
        assert_eq!(classify("伏笔"), SectionKey::OpenThreads);
    }

    #[test]
    fn unknown_and_empty_fall_back_to_misc() {
        assert_eq!(classify(""), SectionKey::Misc);
        assert_eq!(classify("   "), SectionKey::Misc);
        assert_eq!(classify("random bucket"), SectionKey::Misc);
    }
}
