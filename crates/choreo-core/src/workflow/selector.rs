//! Responder selection: which team members to engage on an incident.

use choreo_types::incident::{Category, Incident};
use choreo_types::team::TeamMember;

/// Maximum number of responders engaged per incident.
pub const MAX_RESPONDERS: usize = 5;

/// Maximum number of on-call members placed at the head of the selection.
pub const MAX_ON_CALL: usize = 2;

/// Skill keywords relevant to each category. Categories without an entry
/// contribute no skill matches.
pub fn category_skills(category: Category) -> &'static [&'static str] {
    match category {
        Category::Database => &["postgresql", "mysql", "mongodb", "dba", "sql"],
        Category::Infrastructure => &["kubernetes", "aws", "docker", "sre", "devops"],
        Category::Network => &["networking", "dns", "load-balancer", "firewall"],
        Category::Security => &["security", "soc", "incident-response"],
        Category::Application => &["backend", "frontend", "java", "python", "nodejs"],
        Category::Performance => &["performance", "optimization", "profiling"],
        Category::Integration | Category::Unknown => &[],
    }
}

/// Choose up to [`MAX_RESPONDERS`] distinct members from `roster`.
///
/// Order of preference: on-call members (at most two), then members whose
/// skills match the incident category, then anyone else, each group in
/// roster order. Deterministic for identical inputs.
pub fn select_responders<'r>(incident: &Incident, roster: &'r [TeamMember]) -> Vec<&'r TeamMember> {
    let mut selected: Vec<&TeamMember> = Vec::with_capacity(MAX_RESPONDERS.min(roster.len()));

    let push = |selected: &mut Vec<&'r TeamMember>, member: &'r TeamMember| {
        if selected.len() < MAX_RESPONDERS && !selected.iter().any(|m| m.id == member.id) {
            selected.push(member);
        }
    };

    for member in roster.iter().filter(|m| m.on_call).take(MAX_ON_CALL) {
        push(&mut selected, member);
    }

    let skills = category_skills(incident.category);
    if !skills.is_empty() {
        for member in roster.iter().filter(|m| m.has_any_skill(skills)) {
            push(&mut selected, member);
        }
    }

    for member in roster {
        push(&mut selected, member);
    }

    selected
}
