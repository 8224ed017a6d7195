use clap::{Arg, Command};
use contact_relay::contrast::{compute_contrast, TextSize};
use serde::Deserialize;
use std::process;

/// One foreground/background check. `size` defaults to normal text.
#[derive(Debug, Deserialize)]
struct ContrastPair {
    name: String,
    fg: String,
    bg: String,
    #[serde(default)]
    size: TextSize,
}

/// The site's theme palette pairs. Button text is large per WCAG
/// (>= 18pt, or 14pt bold).
fn default_pairs() -> Vec<ContrastPair> {
    fn pair(name: &str, fg: &str, bg: &str, size: TextSize) -> ContrastPair {
        ContrastPair {
            name: name.to_string(),
            fg: fg.to_string(),
            bg: bg.to_string(),
            size,
        }
    }
    vec![
        pair(
            "Light theme - body text on bg",
            "#0f172a",
            "#f7fafc",
            TextSize::Normal,
        ),
        pair(
            "Light theme - primary button (white on primary)",
            "#ffffff",
            "#0b61ff",
            TextSize::Large,
        ),
        pair(
            "Classic theme - body text on bg",
            "#0b2a2f",
            "#fbfaf6",
            TextSize::Normal,
        ),
        pair(
            "Classic theme - primary button (white on primary)",
            "#ffffff",
            "#1f3a55",
            TextSize::Large,
        ),
        pair(
            "Dark theme - body text on bg",
            "#eaf4ff",
            "#001226",
            TextSize::Normal,
        ),
        pair(
            "Dark theme - primary button (white on primary)",
            "#ffffff",
            "#001540",
            TextSize::Large,
        ),
        pair(
            "Dark theme - muted on surface",
            "#9fb0c8",
            "#041425",
            TextSize::Normal,
        ),
    ]
}

fn load_pairs(path: &str) -> anyhow::Result<Vec<ContrastPair>> {
    let content = std::fs::read_to_string(path)?;
    parse_pairs(&content)
}

fn parse_pairs(content: &str) -> anyhow::Result<Vec<ContrastPair>> {
    let pairs: Vec<ContrastPair> = serde_yaml::from_str(content)?;
    Ok(pairs)
}

fn main() {
    env_logger::init();

    let matches = Command::new("check-contrast")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audits WCAG color-contrast ratios for the site's theme palettes")
        .arg(
            Arg::new("pairs")
                .long("pairs")
                .value_name("FILE")
                .help("YAML list of {name, fg, bg, size} checks to run instead of the built-in set")
                .action(clap::ArgAction::Set),
        )
        .get_matches();

    let pairs = match matches.get_one::<String>("pairs") {
        Some(path) => match load_pairs(path) {
            Ok(pairs) => pairs,
            Err(e) => {
                eprintln!("Error loading pairs file '{path}': {e}");
                process::exit(1);
            }
        },
        None => default_pairs(),
    };

    println!("WCAG Contrast Report");
    println!("---------------------");
    for pair in &pairs {
        match compute_contrast(&pair.fg, &pair.bg, pair.size) {
            Ok(result) => println!(
                "{}: {} on {} => ratio {} | AA: {} | AAA: {}",
                pair.name, pair.fg, pair.bg, result.ratio, result.aa, result.aaa
            ),
            Err(e) => {
                eprintln!("{}: {e}", pair.name);
                process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_with_explicit_and_defaulted_size() {
        let yaml = "\
- name: body text
  fg: '#0f172a'
  bg: '#f7fafc'
- name: primary button
  fg: '#ffffff'
  bg: '#0b61ff'
  size: large
- name: footnote
  fg: '#777777'
  bg: '#ffffff'
  size: normal
";
        let pairs = parse_pairs(yaml).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].name, "body text");
        assert_eq!(pairs[0].fg, "#0f172a");
        // size omitted defaults to normal text
        assert_eq!(pairs[0].size, TextSize::Normal);
        assert_eq!(pairs[1].size, TextSize::Large);
        assert_eq!(pairs[2].size, TextSize::Normal);
    }

    #[test]
    fn test_parse_pairs_rejects_bad_input() {
        assert!(parse_pairs("- name: missing colors").is_err());
        assert!(parse_pairs("not yaml: [").is_err());
        // unknown size values are rejected, not defaulted
        assert!(parse_pairs("- name: x\n  fg: '#fff'\n  bg: '#000'\n  size: huge\n").is_err());
    }

    #[test]
    fn test_default_pairs_all_compute() {
        for pair in default_pairs() {
            assert!(compute_contrast(&pair.fg, &pair.bg, pair.size).is_ok(), "{}", pair.name);
        }
    }
}
