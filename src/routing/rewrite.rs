//! URL rewriting.
//!
//! # Responsibilities
//! - Compile rewrite rules (pattern + replacement template) once
//! - Apply a vhost's rules to a URL in declaration order
//! - Report redirects and early stops as structured outcomes
//!
//! # Rule Evaluation
//! ```text
//! no match                      → next rule
//! candidate starts with "http"  → Redirect(candidate), pipeline ends with 301
//! candidate ends with "-LAST"  → Stop(candidate minus marker), later rules skipped
//! otherwise                     → Continue(candidate)
//! ```

use regex::{Captures, Regex};

/// Suffix of a rewritten URL that stops further rewriting.
const STOP_MARKER: &str = "-LAST";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(usize),
}

/// A replacement template parsed into literal and capture segments.
///
/// `$N` refers to capture group `N` (1-indexed). When several digits follow
/// the `$`, the longest prefix naming an existing group is used, so with two
/// groups `$12` reads as group 1 followed by a literal `2`. A `$` not followed
/// by a valid group number is kept literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `text` for a pattern with `groups` capture groups.
    pub fn parse(text: &str, groups: usize) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();

            let group = (1..=digits).rev().find_map(|len| {
                after[..len]
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=groups).contains(n))
                    .map(|n| (n, len))
            });

            match group {
                Some((index, len)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Capture(index));
                    rest = &after[len..];
                }
                None => {
                    literal.push('$');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Substitute captures into the template. Groups that did not
    /// participate in the match expand to nothing.
    pub fn expand(&self, captures: &Captures<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Capture(index) => {
                    if let Some(m) = captures.get(*index) {
                        out.push_str(m.as_str());
                    }
                }
            }
        }
        out
    }
}

/// The result of applying one matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Use the new URL and keep applying rules.
    Continue(String),
    /// Use the new URL and apply no further rules.
    Stop(String),
    /// Answer with a permanent redirect to this absolute target.
    Redirect(String),
}

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    regex: Regex,
    replacement: String,
    template: Template,
}

impl RewriteRule {
    pub fn compile(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        let template = Template::parse(replacement, regex.captures_len() - 1);

        Ok(Self {
            regex,
            replacement: replacement.to_string(),
            template,
        })
    }

    /// Apply the rule to `url`; `None` when the pattern does not match.
    ///
    /// The outcome is decided on the substituted URL, so an absolute target
    /// keeps any `-LAST` text and a marker brought in by a capture still stops.
    pub fn apply(&self, url: &str) -> Option<RuleOutcome> {
        let captures = self.regex.captures(url)?;
        let candidate = self.template.expand(&captures);

        if candidate.starts_with("http") {
            return Some(RuleOutcome::Redirect(candidate));
        }
        Some(match candidate.strip_suffix(STOP_MARKER) {
            Some(kept) => RuleOutcome::Stop(kept.to_string()),
            None => RuleOutcome::Continue(candidate),
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Outcome of running a vhost's full rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewritten {
    /// Continue with this URL (possibly unchanged).
    Url(String),
    /// Stop the pipeline with a 301 to this target.
    Redirect(String),
}

/// Apply `rules` to `url` in a single left-to-right pass.
pub fn rewrite(rules: &[RewriteRule], url: &str) -> Rewritten {
    let mut current = url.to_string();

    for rule in rules {
        match rule.apply(&current) {
            None => continue,
            Some(RuleOutcome::Redirect(target)) => {
                tracing::debug!(rule = %rule.pattern(), target = %target, "Rewrite issued redirect");
                return Rewritten::Redirect(target);
            }
            Some(RuleOutcome::Continue(next)) => {
                tracing::trace!(rule = %rule.pattern(), from = %current, to = %next, "Rewrote URL");
                current = next;
            }
            Some(RuleOutcome::Stop(next)) => {
                tracing::trace!(rule = %rule.pattern(), from = %current, to = %next, "Rewrote URL, stopping");
                current = next;
                break;
            }
        }
    }

    Rewritten::Url(current)
}
