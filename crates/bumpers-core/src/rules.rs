//! Compiled rules, `when` normalization, and first-match selection
//!
//! A [`Rule`] is the compiled form of one config entry: a command-text
//! regex, a tool filter, a message template, a generate mode, and the
//! normalized [`WhenSet`] that decides which events and content sources the
//! rule applies to. Matching is deliberately simple: file order, first match
//! wins, no overlap resolution.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::fmt;

use crate::generate::GenerateMode;
use crate::hook_events::{EventTag, SourceTag};

/// One tag of a rule's `when` set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WhenTag {
    Pre,
    Post,
    Input,
    Output,
    Intent,
    Prompt,
}

impl WhenTag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WhenTag::Pre => "pre",
            WhenTag::Post => "post",
            WhenTag::Input => "input",
            WhenTag::Output => "output",
            WhenTag::Intent => "intent",
            WhenTag::Prompt => "prompt",
        }
    }

    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "pre" => Some(WhenTag::Pre),
            "post" => Some(WhenTag::Post),
            "input" => Some(WhenTag::Input),
            "output" => Some(WhenTag::Output),
            "intent" => Some(WhenTag::Intent),
            "prompt" => Some(WhenTag::Prompt),
            _ => None,
        }
    }

    /// Source tags name where the matched text comes from; the rest are
    /// event tags.
    pub const fn is_source(&self) -> bool {
        matches!(
            self,
            WhenTag::Input | WhenTag::Output | WhenTag::Intent | WhenTag::Prompt
        )
    }
}

impl From<EventTag> for WhenTag {
    fn from(tag: EventTag) -> Self {
        match tag {
            EventTag::Pre => WhenTag::Pre,
            EventTag::Post => WhenTag::Post,
        }
    }
}

impl From<SourceTag> for WhenTag {
    fn from(tag: SourceTag) -> Self {
        match tag {
            SourceTag::Input => WhenTag::Input,
            SourceTag::Output => WhenTag::Output,
            SourceTag::Intent => WhenTag::Intent,
            SourceTag::Prompt => WhenTag::Prompt,
        }
    }
}

impl fmt::Display for WhenTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized `when` set of a rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhenSet {
    tags: BTreeSet<WhenTag>,
}

/// Error produced for a tag outside the `when` vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown when tag: {}", self.0)
    }
}

impl WhenSet {
    /// Normalize a raw `when` list into its effective set.
    ///
    /// Rules applied in order:
    /// 1. no positive tags seeds the backward-compatible default
    ///    `{pre, input}`;
    /// 2. `intent` implies `post`;
    /// 3. `post` with no source tag implies `output`;
    /// 4. `pre` with no source tag implies `input`;
    /// 5. `!tag` entries remove their tag after all expansion.
    pub fn normalize(raw: &[String]) -> Result<WhenSet, UnknownTag> {
        let mut includes: BTreeSet<WhenTag> = BTreeSet::new();
        let mut excludes: BTreeSet<WhenTag> = BTreeSet::new();

        for entry in raw {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (negated, name) = match entry.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, entry),
            };
            let tag =
                WhenTag::try_from_str(name).ok_or_else(|| UnknownTag(entry.to_string()))?;
            if negated {
                excludes.insert(tag);
            } else {
                includes.insert(tag);
            }
        }

        let mut tags = if includes.is_empty() {
            BTreeSet::from([WhenTag::Pre, WhenTag::Input])
        } else {
            includes
        };

        if tags.contains(&WhenTag::Intent) {
            tags.insert(WhenTag::Post);
        }
        let has_source = tags.iter().any(WhenTag::is_source);
        if tags.contains(&WhenTag::Post) && !has_source {
            tags.insert(WhenTag::Output);
        }
        if tags.contains(&WhenTag::Pre) && !has_source {
            tags.insert(WhenTag::Input);
        }

        for tag in &excludes {
            tags.remove(tag);
        }

        Ok(WhenSet { tags })
    }

    pub fn contains(&self, tag: WhenTag) -> bool {
        self.tags.contains(&tag)
    }

    #[cfg(test)]
    fn from_tags(tags: &[WhenTag]) -> WhenSet {
        WhenSet {
            tags: tags.iter().copied().collect(),
        }
    }
}

/// A compiled policy rule
#[derive(Debug, Clone)]
pub struct Rule {
    /// Regex applied to the selected content text
    pub pattern: Regex,
    /// Tool-name filter; `None` matches any tool
    pub tool: Option<Regex>,
    /// Message template handed to the agent on a hit
    pub send: String,
    /// How the rendered message is post-processed
    pub generate: GenerateMode,
    /// Events and content sources this rule applies to
    pub when: WhenSet,
}

/// The default tool filter pattern
pub const DEFAULT_TOOL_PATTERN: &str = "^Bash$";

/// Compile a case-insensitive tool filter; an empty pattern means any tool.
pub fn compile_tool_filter(pattern: &str) -> Result<Option<Regex>, regex::Error> {
    if pattern.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
}

impl Rule {
    /// Whether this rule applies to the given event/source/tool combination.
    ///
    /// The event tag is `None` for UserPromptSubmit, which has no pre/post
    /// side; the tool filter is only consulted for tool events.
    pub fn applies_to(
        &self,
        event: Option<EventTag>,
        source: SourceTag,
        tool_name: Option<&str>,
    ) -> bool {
        if let Some(event) = event
            && !self.when.contains(event.into())
        {
            return false;
        }
        if !self.when.contains(source.into()) {
            return false;
        }
        if let (Some(tool_name), Some(filter)) = (tool_name, &self.tool)
            && !filter.is_match(tool_name)
        {
            return false;
        }
        true
    }

    /// Apply the command regex. Empty content never matches: a rule must
    /// not fire on a hook that produced no evidence.
    pub fn is_match(&self, content: &str) -> bool {
        !content.is_empty() && self.pattern.is_match(content)
    }
}

/// Iterate the rules applicable to one (event, source, tool) combination in
/// file order, paired with their config index for logging.
pub fn applicable_rules<'a, 'b>(
    rules: &'a [Rule],
    event: Option<EventTag>,
    source: SourceTag,
    tool_name: Option<&'b str>,
) -> impl Iterator<Item = (usize, &'a Rule)> {
    rules
        .iter()
        .enumerate()
        .filter(move |(_, rule)| rule.applies_to(event, source, tool_name))
}

/// First rule in file order that applies and whose pattern matches.
pub fn first_match<'a>(
    rules: &'a [Rule],
    event: Option<EventTag>,
    source: SourceTag,
    tool_name: Option<&str>,
    content: &str,
) -> Option<(usize, &'a Rule)> {
    applicable_rules(rules, event, source, tool_name)
        .find(|(_, rule)| rule.is_match(content))
}
