//! Budgeted renderer: greedy, prefix-preserving serialization.
//!
//! Sections are emitted in canonical order. A header that does not fit ends
//! rendering outright; a bullet that does not fit ends only its own section.
//! Earlier sections and bullets are never dropped to make room for later ones.

use crate::retriever::SelectedBullet;
use crate::token::estimate_tokens;
use quillmind_core::playbook::{Bullet, Playbook, SectionKey};
use serde::Serialize;

/// Rendered text plus the ids of the bullets it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub text: String,
    pub bullet_ids: Vec<String>,
    /// Sum of per-line estimates; never exceeds the budget.
    pub tokens_used: usize,
}

impl Rendered {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Whole playbook with usage counters, for curator review.
///
/// Empty sections still get a header so the curator sees the full layout.
pub fn render_curator_view(playbook: &Playbook, budget: usize) -> Rendered {
    let groups: Vec<(&str, Vec<&Bullet>)> = playbook
        .canonical_sections()
        .map(|(_, section)| (section.title.as_str(), section.bullets.iter().collect()))
        .collect();
    render_groups(groups, budget, curator_line)
}

/// Only the selected bullets, grouped by section in rank order.
pub fn render_injection_view(selection: &[SelectedBullet], budget: usize) -> Rendered {
    let groups: Vec<(&str, Vec<&Bullet>)> = SectionKey::ALL
        .into_iter()
        .filter_map(|key| {
            let in_section: Vec<&SelectedBullet> =
                selection.iter().filter(|s| s.section == key).collect();
            let first = in_section.first()?;
            let title = first.section_title.as_str();
            Some((title, in_section.into_iter().map(|s| &s.bullet).collect()))
        })
        .collect();
    render_groups(groups, budget, injection_line)
}

fn header_line(title: &str) -> String {
    format!("## {title}\n")
}

fn curator_line(bullet: &Bullet) -> String {
    format!(
        "- [{}] {} (hits: {}, helpful: {}, harmful: {})\n",
        bullet.id, bullet.content, bullet.hit_count, bullet.helpful_count, bullet.harmful_count
    )
}

fn injection_line(bullet: &Bullet) -> String {
    format!("- [{}] {}\n", bullet.id, bullet.content)
}

fn render_groups(
    groups: Vec<(&str, Vec<&Bullet>)>,
    budget: usize,
    line: fn(&Bullet) -> String,
) -> Rendered {
    let mut out = Rendered::default();

    for (title, bullets) in groups {
        let header = header_line(title);
        let cost = estimate_tokens(&header);
        if out.tokens_used + cost > budget {
            break;
        }
        out.text.push_str(&header);
        out.tokens_used += cost;

        for bullet in bullets {
            let entry = line(bullet);
            let cost = estimate_tokens(&entry);
            if out.tokens_used + cost > budget {
                break;
            }
            out.text.push_str(&entry);
            out.tokens_used += cost;
            out.bullet_ids.push(bullet.id.clone());
        }
    }

    out
}
