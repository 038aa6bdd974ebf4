use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::info;

use crate::models::{ColorSpec, MAX_COLORS};

pub fn default_palette() -> Vec<String> {
    [
        "electric blue", "neon green", "hot pink", "bright orange", "deep purple",
        "crimson red", "golden yellow", "turquoise", "magenta", "lime green",
        "coral", "royal blue", "emerald green", "sunset orange", "violet",
        "teal", "ruby red", "amber", "indigo", "chartreuse",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Draws random color specs from an injected palette.
pub struct ColorPicker {
    palette: Vec<String>,
    rng: Mutex<StdRng>,
}

impl ColorPicker {
    pub fn new(palette: Vec<String>, seed: Option<u64>) -> Self {
        let palette = if palette.is_empty() { default_palette() } else { palette };
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { palette, rng: Mutex::new(rng) }
    }

    /// `count` defaults to a uniform draw from 1..=3 and is clamped to the palette size.
    pub fn pick(&self, count: Option<usize>) -> ColorSpec {
        let mut rng = self.rng.lock();
        let count = count.unwrap_or_else(|| rng.gen_range(1..=MAX_COLORS));
        let count = count.clamp(1, MAX_COLORS).min(self.palette.len());
        let colors: Vec<String> = self.palette.choose_multiple(&mut *rng, count).cloned().collect();
        info!("🎨 Randomly selected {} color(s): {}", colors.len(), colors.join(", "));
        ColorSpec::new(colors).unwrap_or_else(ColorSpec::fallback)
    }
}

pub fn count_in_words(n: usize) -> String {
    match n {
        1 => "one".into(),
        2 => "two".into(),
        n => n.to_string(),
    }
}

pub fn build_prompt(product: &str, brand: &str, spec: &ColorSpec) -> String {
    let noun = if spec.count() == 1 { "color" } else { "colors" };
    let color_instruction = format!(
        "using exactly {} bold, vibrant {noun}: {}",
        count_in_words(spec.count()),
        spec.joined()
    );
    let prompt = format!(
        "{product} placed at the center in full photorealism, surrounded by surreal vector illustrations {color_instruction} that match the product's mood.\n\
The scene is minimalistic yet energetic, with abstract vector shapes (symbols, lines, expressions, etc.) orbiting or interacting with the product.\n\
Add the real logo clearly and integrate a short 3–4 word slogan at the bottom. {brand}\n\
Style: surreal, high-resolution, minimal, cinematic lighting, 1:1 aspect ratio.\n"
    );
    info!("📝 Prompt built with {} color(s): {}", spec.count(), spec.joined());
    info!("📝 Prompt preview: {}...", prompt.chars().take(100).collect::<String>());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(colors: &[&str]) -> ColorSpec {
        ColorSpec::new(colors.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn prompt_states_count_in_words_and_lists_colors() {
        let cases = [
            (spec(&["teal"]), "exactly one bold, vibrant color: teal"),
            (spec(&["teal", "amber"]), "exactly two bold, vibrant colors: teal, amber"),
            (spec(&["teal", "amber", "coral"]), "exactly 3 bold, vibrant colors: teal, amber, coral"),
        ];
        for (spec, expected) in cases {
            let prompt = build_prompt("sneaker", "Stride", &spec);
            assert!(prompt.contains(expected), "missing {expected:?} in {prompt}");
            assert!(prompt.starts_with("sneaker placed at the center"));
            assert!(prompt.contains("slogan at the bottom. Stride"));
        }
    }

    #[test]
    fn picker_honours_explicit_count_with_distinct_colors() {
        let picker = ColorPicker::new(default_palette(), Some(42));
        for count in 1..=3 {
            let picked = picker.pick(Some(count));
            assert_eq!(picked.count(), count);
            let mut dedup = picked.colors().to_vec();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), count);
            assert!(picked.colors().iter().all(|c| default_palette().contains(c)));
        }
    }

    #[test]
    fn picker_draws_count_between_one_and_three() {
        let picker = ColorPicker::new(default_palette(), Some(7));
        for _ in 0..50 {
            let n = picker.pick(None).count();
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn empty_palette_uses_defaults() {
        let picker = ColorPicker::new(Vec::new(), Some(3));
        assert!(default_palette().contains(&picker.pick(Some(1)).colors()[0]));
    }

    #[test]
    fn same_seed_same_colors() {
        let a = ColorPicker::new(default_palette(), Some(99));
        let b = ColorPicker::new(default_palette(), Some(99));
        assert_eq!(a.pick(None), b.pick(None));
    }

    #[test]
    fn small_palette_limits_count() {
        let picker = ColorPicker::new(vec!["black".into()], Some(1));
        assert_eq!(picker.pick(Some(3)).colors(), &["black".to_string()]);
    }
}
