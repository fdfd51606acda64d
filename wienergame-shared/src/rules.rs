//! Free-text triggers evaluated against group messages.
//!
//! A [`RuleSet`] is an ordered list of [`Rule`]s. Each rule has a cheap
//! predicate and an extraction step; the first rule whose predicate holds and
//! whose extraction succeeds decides the [`MessageAction`].

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Username;

pub const TASK_KEYWORD: &str = "Завдання";
pub const GAME_HASHTAG: &str = "#WienerGame";

static MENTOR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Ментор: @(\S+)").expect("mentor pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    /// First line of the message, verbatim.
    pub description: String,
    pub mentor: Username,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAction {
    RecordTask(TaskCompletion),
}

pub struct Rule {
    pub name: &'static str,
    predicate: fn(&str) -> bool,
    extract: fn(&str) -> Option<MessageAction>,
}

impl Rule {
    pub const fn new(
        name: &'static str,
        predicate: fn(&str) -> bool,
        extract: fn(&str) -> Option<MessageAction>,
    ) -> Self {
        Self {
            name,
            predicate,
            extract,
        }
    }

    pub fn apply(&self, text: &str) -> Option<MessageAction> {
        if (self.predicate)(text) {
            (self.extract)(text)
        } else {
            None
        }
    }
}

pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Returns the name of the matching rule together with its action.
    pub fn evaluate(&self, text: &str) -> Option<(&'static str, MessageAction)> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(text).map(|action| (rule.name, action)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(vec![task_completion_rule()])
    }
}

pub fn task_completion_rule() -> Rule {
    Rule::new(
        "task_completion",
        |text| text.contains(TASK_KEYWORD) && text.contains(GAME_HASHTAG),
        extract_task_completion,
    )
}

fn extract_task_completion(text: &str) -> Option<MessageAction> {
    let caps = MENTOR_LINE.captures(text)?;
    let mentor = Username::parse(caps.get(1)?.as_str()).ok()?;
    let description = text
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r')
        .to_string();
    Some(MessageAction::RecordTask(TaskCompletion {
        description,
        mentor,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(text: &str) -> Option<TaskCompletion> {
        match RuleSet::default().evaluate(text) {
            Some((_, MessageAction::RecordTask(tc))) => Some(tc),
            None => None,
        }
    }

    #[test]
    fn full_message_yields_first_line_and_mentor() {
        let tc = completion("Завдання X\n#WienerGame\nМентор: @bob").unwrap();
        assert_eq!(tc.description, "Завдання X");
        assert_eq!(tc.mentor.as_str(), "bob");
    }

    #[test]
    fn mentor_line_may_appear_anywhere() {
        let text = "Завдання 3: прибрати\r\nМентор: @olena \nзроблено #WienerGame";
        let tc = completion(text).unwrap();
        assert_eq!(tc.description, "Завдання 3: прибрати");
        assert_eq!(tc.mentor.as_str(), "olena");
    }

    #[test]
    fn missing_any_marker_is_ignored() {
        assert!(completion("Завдання X\nМентор: @bob").is_none());
        assert!(completion("task X\n#WienerGame\nМентор: @bob").is_none());
        assert!(completion("Завдання X\n#WienerGame").is_none());
        assert!(completion("Завдання X\n#WienerGame\nМентор: bob").is_none());
        assert!(completion("").is_none());
    }

    #[test]
    fn evaluate_reports_rule_name() {
        let (name, _) = RuleSet::default()
            .evaluate("Завдання\n#WienerGame\nМентор: @m")
            .unwrap();
        assert_eq!(name, "task_completion");
    }

    #[test]
    fn first_matching_rule_wins() {
        let set = RuleSet::new(vec![
            Rule::new("never", |_| false, |_| unreachable!()),
            Rule::new("declines", |_| true, |_| None),
            task_completion_rule(),
        ]);
        let (name, _) = set.evaluate("Завдання\n#WienerGame\nМентор: @m").unwrap();
        assert_eq!(name, "task_completion");
        assert_eq!(set.len(), 3);
    }
}
