//! Color utilities for CLI output
//!
//! Provides consistent styling for task output prefixes.

use console::{Style, StyledObject};

/// Styles cycled through by output prefixes, one per target host
const PREFIX_STYLES: [fn(Style) -> Style; 6] = [
    Style::cyan,
    Style::green,
    Style::yellow,
    Style::magenta,
    Style::blue,
    Style::red,
];

/// Style an output prefix by the index of its target host
pub fn prefix_style(prefix: &str, index: usize) -> StyledObject<String> {
    let style = PREFIX_STYLES[index % PREFIX_STYLES.len()](Style::new());
    style.apply_to(prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // StyledObject::to_string() includes ANSI escape codes when colors are enabled.
    // Tests use contains() to check the text content regardless of styling.

    #[test]
    fn prefix_style_keeps_text() {
        let styled = prefix_style("[remote] web01: ", 0);
        assert!(styled.to_string().contains("[remote] web01: "));
    }

    #[test]
    fn prefix_style_wraps_index() {
        let styled = prefix_style("p", PREFIX_STYLES.len() + 1);
        assert!(styled.to_string().contains('p'));
    }
}
