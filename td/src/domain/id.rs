//! Task ID generation and resolution
//!
//! IDs use the format: `{8-char-hex}-task-{slug}`
//! Example: `a1b2c3d4-task-book-dentist-appointment`

use tracing::debug;

/// Longest slug kept in an ID
const MAX_SLUG_LEN: usize = 40;

/// Generate a task ID from its title
///
/// The hex prefix comes from the random tail of a v7 UUID, so two tasks with
/// the same title still get distinct IDs.
pub fn generate_task_id(title: &str) -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    let hex = &uuid[uuid.len() - 8..];
    let slug = slugify(title);
    debug!(%hex, %slug, "generate_task_id: called");
    if slug.is_empty() {
        format!("{}-task", hex)
    } else {
        format!("{}-task-{}", hex, slug)
    }
}

/// Slugify a title for use in IDs
fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.chars().count() <= MAX_SLUG_LEN {
        return slug;
    }
    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Resolves a partial reference (hex prefix, slug fragment) to a full task ID
pub struct IdResolver<'a> {
    ids: &'a [String],
}

impl<'a> IdResolver<'a> {
    pub fn new(ids: &'a [String]) -> Self {
        Self { ids }
    }

    /// Resolve a partial reference to a full ID
    ///
    /// Returns:
    /// - Ok(Some(id)) if exactly one match (an exact match always wins)
    /// - Ok(None) if no matches
    /// - Err with candidates if ambiguous
    pub fn resolve(&self, reference: &str) -> Result<Option<String>, Vec<String>> {
        debug!(%reference, "IdResolver::resolve: called");
        if let Some(exact) = self.ids.iter().find(|id| id.as_str() == reference) {
            return Ok(Some(exact.clone()));
        }

        let mut matches: Vec<String> = self
            .ids
            .iter()
            .filter(|id| Self::matches(id, reference))
            .cloned()
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(matches),
        }
    }

    fn matches(id: &str, reference: &str) -> bool {
        if id.starts_with(reference) {
            return true;
        }

        // Slug contains match
        match id.split_once("-task-") {
            Some((_, slug)) => slug.contains(reference),
            None => false,
        }
    }
}
