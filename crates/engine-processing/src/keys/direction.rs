use bigdecimal::BigDecimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }

    /// Negative amounts leave the account; everything else, including a
    /// missing amount, counts as incoming.
    pub fn from_sign(amount: Option<&BigDecimal>) -> Self {
        match amount {
            Some(value) if *value < BigDecimal::from(0) => Direction::Debit,
            _ => Direction::Credit,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matching rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionOutcome {
    Debit,
    Credit,
    /// Credit, unless the amount itself is negative.
    CreditUnlessNegative,
}

impl DirectionOutcome {
    fn resolve(self, amount: Option<&BigDecimal>) -> Direction {
        match self {
            DirectionOutcome::Debit => Direction::Debit,
            DirectionOutcome::Credit => Direction::Credit,
            DirectionOutcome::CreditUnlessNegative => Direction::from_sign(amount),
        }
    }
}

/// Fires when the case-folded operation type contains any of `keywords`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionRule {
    pub keywords: Vec<String>,
    pub outcome: DirectionOutcome,
}

impl DirectionRule {
    pub fn new<I, S>(keywords: I, outcome: DirectionOutcome) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DirectionRule {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
            outcome,
        }
    }

    fn matches(&self, operation_type: &str) -> bool {
        self.keywords.iter().any(|k| operation_type.contains(k.as_str()))
    }
}

/// Ordered rule table; the first matching rule wins, otherwise the sign of
/// the amount decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionRules {
    rules: Vec<DirectionRule>,
}

impl Default for DirectionRules {
    fn default() -> Self {
        DirectionRules::new(vec![
            DirectionRule::new(["compensation"], DirectionOutcome::Debit),
            DirectionRule::new(
                ["replenishment", "nivellement"],
                DirectionOutcome::CreditUnlessNegative,
            ),
        ])
    }
}

impl DirectionRules {
    pub fn new(rules: Vec<DirectionRule>) -> Self {
        DirectionRules { rules }
    }

    /// No keyword rules at all: direction is the sign of the amount.
    pub fn sign_only() -> Self {
        DirectionRules { rules: Vec::new() }
    }

    pub fn push(&mut self, rule: DirectionRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[DirectionRule] {
        &self.rules
    }

    pub fn infer(&self, operation_type: Option<&str>, amount: Option<&BigDecimal>) -> Direction {
        let folded = operation_type.map(str::to_lowercase).unwrap_or_default();
        if !folded.is_empty() {
            if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&folded)) {
                return rule.outcome.resolve(amount);
            }
        }
        Direction::from_sign(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amount(raw: &str) -> BigDecimal {
        BigDecimal::from_str(raw).unwrap()
    }

    #[test]
    fn default_rules() {
        let rules = DirectionRules::default();
        let positive = amount("10");
        let negative = amount("-10");

        assert_eq!(
            rules.infer(Some("Compensation fee"), Some(&positive)),
            Direction::Debit
        );
        assert_eq!(
            rules.infer(Some("REPLENISHMENT"), Some(&positive)),
            Direction::Credit
        );
        assert_eq!(
            rules.infer(Some("nivellement"), Some(&negative)),
            Direction::Debit
        );
    }

    #[test]
    fn falls_back_to_sign() {
        let rules = DirectionRules::default();
        assert_eq!(rules.infer(None, Some(&amount("-1"))), Direction::Debit);
        assert_eq!(rules.infer(Some("transfer"), Some(&amount("1"))), Direction::Credit);
        assert_eq!(rules.infer(None, None), Direction::Credit);
    }

    #[test]
    fn custom_rules_take_precedence_in_order() {
        let mut rules = DirectionRules::sign_only();
        rules.push(DirectionRule::new(["Refund"], DirectionOutcome::Credit));
        rules.push(DirectionRule::new(["refund", "fee"], DirectionOutcome::Debit));

        assert_eq!(
            rules.infer(Some("customer refund"), Some(&amount("-5"))),
            Direction::Credit
        );
        assert_eq!(rules.infer(Some("fee"), Some(&amount("5"))), Direction::Debit);
    }
}
