/// Placeholder resolution — the round-by-round substitution loop.
///
/// Each round resolves exactly one placeholder: the leftmost complete token
/// reference if there is one, otherwise the first variable reference whose
/// value is known. The token pattern cannot span a nested `[`/`]`, so inner
/// placeholders collapse to literal text before their enclosing ones match.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::core::inventory::Inventory;
use crate::core::random::RandomSource;
use crate::core::selector::Selector;
use crate::schema::state::State;

/// Default cap on substitutions per render.
pub const DEFAULT_MAX_ROUNDS: u32 = 30;
/// Default cap on variable references examined per round.
pub const DEFAULT_VAR_SCAN_LIMIT: usize = 20;

// Identifiers are ASCII word characters only; `(?-u)` keeps `\w` off Unicode.

/// `[Category]` or `[Category:clause,clause]`.
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)\[(\w+)(:((,?(\w+(!?=\w+)?)?)+))?\]").expect("token pattern is valid")
});

/// `[$name]`.
static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)\[\$(\w+)\]").expect("variable pattern is valid"));

/// Limits applied while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum number of substitutions before rendering stops.
    pub max_rounds: u32,
    /// Maximum number of `[$name]` references considered in one round.
    pub var_scan_limit: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            var_scan_limit: DEFAULT_VAR_SCAN_LIMIT,
        }
    }
}

/// Render `instructions` with the default limits.
pub fn render(
    instructions: &str,
    inventory: &Inventory,
    state: &mut State,
    source: &mut RandomSource,
) -> String {
    render_with_config(instructions, inventory, state, source, &RenderConfig::default())
}

/// Render `instructions`, one substitution per round, until nothing more
/// can be resolved or the round budget runs out.
///
/// Unresolved placeholders are left in the output as literal text.
pub fn render_with_config(
    instructions: &str,
    inventory: &Inventory,
    state: &mut State,
    source: &mut RandomSource,
    config: &RenderConfig,
) -> String {
    let mut working = instructions.to_string();
    let mut rounds = config.max_rounds;
    let mut settled = false;

    while rounds > 0 {
        let replaced = replace_next_token(&mut working, inventory, state, source)
            || replace_next_var(&mut working, state, config.var_scan_limit);

        if !replaced {
            settled = true;
            break;
        }
        rounds -= 1;
        trace!(rounds_left = rounds, working = %working, "round complete");
    }

    if !settled {
        debug!(max_rounds = config.max_rounds, output = %working, "round budget exhausted");
    }
    working
}

/// Resolve the leftmost complete token placeholder.
///
/// Draws exactly one offset when a placeholder is found. A selector that
/// matches nothing is replaced by an empty string and sets no variables.
pub(crate) fn replace_next_token(
    working: &mut String,
    inventory: &Inventory,
    state: &mut State,
    source: &mut RandomSource,
) -> bool {
    let (range, selector) = {
        let Some(caps) = TOKEN_PATTERN.captures(working.as_str()) else {
            return false;
        };
        let Some(whole) = caps.get(0) else {
            return false;
        };
        let clauses = caps.get(3).map_or("", |m| m.as_str());
        (whole.range(), Selector::parse(&caps[1], clauses))
    };

    let offset = source.next_offset();
    match inventory.pick(&selector, offset) {
        Some(token) => {
            debug!(
                placeholder = &working[range.clone()],
                content = %token.content,
                "resolved token"
            );
            working.replace_range(range, &token.content);
            state.set_vars(&token.on_select);
        }
        None => {
            debug!(placeholder = &working[range.clone()], "no token matches selector");
            working.replace_range(range, "");
        }
    }
    true
}

/// Resolve the first `[$name]` reference whose variable has a non-empty value.
pub(crate) fn replace_next_var(working: &mut String, state: &State, scan_limit: usize) -> bool {
    let found = VAR_PATTERN
        .captures_iter(working.as_str())
        .take(scan_limit)
        .find_map(|caps| {
            let whole = caps.get(0)?;
            let value = state.get(&caps[1]).filter(|v| !v.is_empty())?;
            Some((whole.range(), value))
        });

    match found {
        Some((range, value)) => {
            debug!(placeholder = &working[range.clone()], %value, "resolved variable");
            working.replace_range(range, value);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inventory::tests::sample_inventory;
    use crate::schema::token::{Tags, Token};

    fn ape_inventory() -> Inventory {
        let mut i = sample_inventory();
        let ape = |content: &str| {
            Token::new(
                "Animal",
                content,
                1.0,
                Tags::from([
                    ("type".to_string(), "mammal".to_string()),
                    ("env".to_string(), "land".to_string()),
                    ("family".to_string(), "ape".to_string()),
                ]),
            )
        };
        i.add(ape("Human").on_select("human", "normal").on_select("sentience", "full"));
        i.add(ape("Chimpanzee").on_select("sentience", "high"));
        let special = Tags::from([("special".to_string(), "true".to_string())]);
        i.add(Token::new("AnimalFamily", "ape", 1.0, special).on_select("sentience", "moderate"));
        i
    }

    #[test]
    fn token_replacement() {
        let i = sample_inventory();
        let mut working = "Example: [Animal]".to_string();
        let replaced =
            replace_next_token(&mut working, &i, &mut State::new(), &mut RandomSource::fixed(0.0));
        assert!(replaced);
        assert_eq!(working, "Example: Aardvark");
    }

    #[test]
    fn token_replacement_is_one_at_a_time() {
        let i = sample_inventory();
        let mut state = State::new();
        let mut source = RandomSource::fixed(0.0);
        let mut working = "Example: [Description] [Animal]".to_string();

        assert!(replace_next_token(&mut working, &i, &mut state, &mut source));
        assert_eq!(working, "Example: Angry [Animal]");

        assert!(replace_next_token(&mut working, &i, &mut state, &mut source));
        assert_eq!(working, "Example: Angry Aardvark");
    }

    #[test]
    fn tagged_token_replacement() {
        let i = sample_inventory();
        let mut working = "Example: [Animal:family=rodent]".to_string();
        replace_next_token(&mut working, &i, &mut State::new(), &mut RandomSource::fixed(0.0));
        assert_eq!(working, "Example: Capybara");
    }

    #[test]
    fn nested_token_resolves_inner_first() {
        let i = sample_inventory();
        let mut working = "Example: [Animal:type=[AnimalType]]".to_string();
        replace_next_token(&mut working, &i, &mut State::new(), &mut RandomSource::fixed(1.0));
        assert_eq!(working, "Example: [Animal:type=cryptid]");
    }

    #[test]
    fn no_token_found() {
        let i = sample_inventory();
        let mut working = "Example: Done".to_string();
        let mut source = RandomSource::manual([]);
        assert!(!replace_next_token(&mut working, &i, &mut State::new(), &mut source));
        assert_eq!(working, "Example: Done");
    }

    #[test]
    fn unmatched_selector_becomes_empty() {
        let i = sample_inventory();
        let mut state = State::new();
        let mut working = "A [Animal:type=bird] B".to_string();
        assert!(replace_next_token(&mut working, &i, &mut state, &mut RandomSource::fixed(0.5)));
        assert_eq!(working, "A  B");
        assert!(state.vars().is_empty());
    }

    #[test]
    fn variable_replacement() {
        let state: State = [("type", "mammal")].into_iter().collect();
        let mut working = "Example: [Animal:type=[$type]]".to_string();
        assert!(replace_next_var(&mut working, &state, DEFAULT_VAR_SCAN_LIMIT));
        assert_eq!(working, "Example: [Animal:type=mammal]");
    }

    #[test]
    fn no_variable_reference() {
        let state: State = [("type", "mammal")].into_iter().collect();
        let mut working = "Example: [Animal:type=amphibian]".to_string();
        assert!(!replace_next_var(&mut working, &state, DEFAULT_VAR_SCAN_LIMIT));
        assert_eq!(working, "Example: [Animal:type=amphibian]");
    }

    #[test]
    fn undefined_variable_left_alone() {
        let state: State = [("type", "mammal")].into_iter().collect();
        let mut working = "Example: [Animal:type=[$selectType]]".to_string();
        assert!(!replace_next_var(&mut working, &state, DEFAULT_VAR_SCAN_LIMIT));
        assert_eq!(working, "Example: [Animal:type=[$selectType]]");
    }

    #[test]
    fn first_known_variable_wins() {
        let state: State = [("b", "two"), ("empty", "")].into_iter().collect();
        let mut working = "[$a] [$empty] [$b] [$b]".to_string();
        assert!(replace_next_var(&mut working, &state, DEFAULT_VAR_SCAN_LIMIT));
        assert_eq!(working, "[$a] [$empty] two [$b]");
    }

    #[test]
    fn variable_scan_limit_applies() {
        let state: State = [("b", "two")].into_iter().collect();
        let mut working = "[$a] [$b]".to_string();
        assert!(!replace_next_var(&mut working, &state, 1));
        assert!(replace_next_var(&mut working, &state, 2));
    }

    #[test]
    fn render_nested() {
        let i = sample_inventory();
        let out = render(
            "Example: [Animal:type=[AnimalType]]",
            &i,
            &mut State::new(),
            &mut RandomSource::fixed(0.0),
        );
        assert_eq!(out, "Example: Aardvark");
    }

    #[test]
    fn render_nested_draws_once_per_placeholder() {
        let i = sample_inventory();
        let mut source = RandomSource::manual([1.0, 0.0]);
        let out = render(
            "Example: [Animal:type=[AnimalType]]",
            &i,
            &mut State::new(),
            &mut source,
        );
        // cryptid first, then the only cryptid
        assert_eq!(out, "Example: Boomalope");
        assert_eq!(source.as_manual_mut().map(|q| q.remaining()), Some(0));
    }

    #[test]
    fn render_with_pinned_variable() {
        let i = sample_inventory();
        let mut state: State = [("type", "mammal")].into_iter().collect();

        let template = "Example: [Animal:type=[$type]]";

        let first = render(template, &i, &mut state, &mut RandomSource::fixed(0.0));
        assert_eq!(first, "Example: Aardvark");

        let second = render(template, &i, &mut state, &mut RandomSource::fixed(1.0));
        assert_eq!(second, "Example: Capybara");
    }

    #[test]
    fn render_applies_on_select() {
        let i = ape_inventory();
        let template = "Example: [Animal:family=ape] Sentience: [$sentience]";

        let mut state = State::new();
        let first = render(template, &i, &mut state, &mut RandomSource::fixed(0.0));
        assert_eq!(first, "Example: Human Sentience: full");
        assert_eq!(state.get("human"), Some("normal"));

        let second = render(template, &i, &mut State::new(), &mut RandomSource::fixed(1.2));
        assert_eq!(second, "Example: Chimpanzee Sentience: high");
    }

    #[test]
    fn variable_set_later_in_template_still_resolves() {
        let i = ape_inventory();
        let out = render(
            "[$sentience] [Animal:family=ape]",
            &i,
            &mut State::new(),
            &mut RandomSource::fixed(0.0),
        );
        assert_eq!(out, "full Human");
    }

    #[test]
    fn render_without_placeholders_is_identity() {
        let i = sample_inventory();
        let mut source = RandomSource::manual([]);
        let out = render("Nothing to see here.", &i, &mut State::new(), &mut source);
        assert_eq!(out, "Nothing to see here.");
    }

    #[test]
    fn unsatisfiable_variable_terminates() {
        let i = sample_inventory();
        let out = render(
            "[$missing] and [Animal]",
            &i,
            &mut State::new(),
            &mut RandomSource::fixed(0.0),
        );
        assert_eq!(out, "[$missing] and Aardvark");
    }

    #[test]
    fn self_referencing_token_stops_at_budget() {
        let mut i = Inventory::new();
        i.add_token("Loop", "x[Loop]", 1.0, Tags::new());

        let out = render("[Loop]", &i, &mut State::new(), &mut RandomSource::fixed(0.0));
        assert_eq!(out, format!("{}[Loop]", "x".repeat(DEFAULT_MAX_ROUNDS as usize)));

        let config = RenderConfig {
            max_rounds: 3,
            ..RenderConfig::default()
        };
        let mut source = RandomSource::fixed(0.0);
        let out = render_with_config("[Loop]", &i, &mut State::new(), &mut source, &config);
        assert_eq!(out, "xxx[Loop]");
    }

    #[test]
    fn zero_round_budget_renders_nothing() {
        let i = sample_inventory();
        let config = RenderConfig {
            max_rounds: 0,
            ..RenderConfig::default()
        };
        let mut source = RandomSource::manual([]);
        let out = render_with_config("[Animal]", &i, &mut State::new(), &mut source, &config);
        assert_eq!(out, "[Animal]");
    }

    #[test]
    fn non_ascii_names_stay_literal() {
        let mut i = Inventory::new();
        i.add_token("Café", "espresso", 1.0, Tags::new());
        let mut state: State = [("naïve", "yes")].into_iter().collect();
        let mut source = RandomSource::manual([]);

        let out = render("[Café] [$naïve]", &i, &mut state, &mut source);
        assert_eq!(out, "[Café] [$naïve]");
    }

    #[test]
    fn clause_with_non_ascii_value_never_matches_whole() {
        let i = sample_inventory();
        let mut working = "[Animal:type=mammïfère]".to_string();
        let mut source = RandomSource::manual([]);
        assert!(!replace_next_token(&mut working, &i, &mut State::new(), &mut source));
        assert_eq!(working, "[Animal:type=mammïfère]");
    }
}
