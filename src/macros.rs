//! Macros for declaring rule tables.

/// Build a [`RuleTier`](crate::core::RuleTier) from per-signal value tables.
///
/// # Example
///
/// ```
/// use statekeeper::core::StateModelConfig;
/// use statekeeper::state_rules;
///
/// let config = StateModelConfig::rules([state_rules! {
///     "lowlim" => { 0 => "in", 1 => "defer" },
///     "highlim" => { 0 => "out", 1 => "defer" },
/// }]);
/// assert_eq!(config.signals.len(), 0);
/// ```
#[macro_export]
macro_rules! state_rules {
    (
        $(
            $signal:expr => { $( $value:expr => $token:expr ),* $(,)? }
        ),* $(,)?
    ) => {
        $crate::core::RuleTier::new(vec![
            $(
                $crate::core::SignalRule::new(
                    $signal,
                    vec![ $( ($crate::signal::RawValue::from($value), $token) ),* ],
                )
            ),*
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{RuleCase, RuleTier};
    use crate::signal::RawValue;

    #[test]
    fn state_rules_macro_builds_tier() {
        let tier: RuleTier = state_rules! {
            "lowlim" => { 0 => "in", 1 => "defer" },
            "decoupled" => { true => "out" },
        };

        assert_eq!(tier.rules.len(), 2);
        assert_eq!(tier.rules[0].signal, "lowlim");
        assert_eq!(
            tier.rules[0].cases[1],
            RuleCase {
                value: RawValue::Int(1),
                token: "defer".to_string()
            }
        );
        assert_eq!(tier.rules[1].cases[0].value, RawValue::Bool(true));
    }

    #[test]
    fn state_rules_macro_accepts_empty_tables() {
        let tier: RuleTier = state_rules! {};
        assert!(tier.rules.is_empty());
    }
}
