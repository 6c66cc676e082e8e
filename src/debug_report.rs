use regshift::{PipelineRun, Rule, RuleKind, Thresholds, Tier};

const TOP_RULES: usize = 5;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(run: &PipelineRun, thresholds: Thresholds, color: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{}",
        palette.bold(palette.paint(
            format!(
                "⚙  Mining rules (confidence ≥ {}, frequency ≥ {})",
                thresholds.min_confidence(),
                thresholds.min_frequency()
            ),
            ansi::CYAN
        ))
    );

    println!("\n{}", palette.paint("━━━ Corpus ━━━", ansi::GRAY));
    print_corpus(run, &palette);

    println!("\n{}", palette.paint("━━━ Systematicity ━━━", ansi::GRAY));
    print_systematicity(run, &palette);

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    if run.rules.is_empty() {
        println!("{}", palette.dim("  No rules extracted"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • No pattern reached the confidence threshold");
        println!("  • Too few events per context (lower --min-frequency)");
        println!("\n{}", palette.dim("  Tip: Set REGSHIFT_LOG=regshift=debug to see per-stage counts"));
    } else {
        print_rules(run, &palette);
    }

    println!("\n{}", palette.paint("━━━ Evaluation ━━━", ansi::GRAY));
    print_evaluation(run, &palette);

    let t = &run.timings;
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Analyze: {}  │  Systematicity: {}  │  Extract: {}  │  Evaluate: {}",
        palette.paint(format!("{:?}", t.total), ansi::GREEN),
        palette.paint(format!("{:?}", t.analyze), ansi::CYAN),
        palette.dim(format!("{:?}", t.systematicity)),
        palette.dim(format!("{:?}", t.extract)),
        palette.dim(format!("{:?}", t.evaluate)),
    );
    println!();
}

fn print_corpus(run: &PipelineRun, palette: &ansi::Palette) {
    let analysis = &run.analysis;
    println!(
        "  {} {}  │  {} {}  │  {} {}",
        palette.paint("pairs:", ansi::BLUE),
        analysis.pairs,
        palette.paint("analyzed:", ansi::BLUE),
        palette.paint(analysis.analyzed().to_string(), ansi::GREEN),
        palette.paint("events:", ansi::BLUE),
        palette.paint(analysis.events.len().to_string(), ansi::YELLOW),
    );
    for skipped in &analysis.skipped {
        println!(
            "    {} {}/{} {}",
            palette.paint("✗ skipped", ansi::YELLOW),
            skipped.corpus_id,
            skipped.sentence_id,
            palette.dim(&skipped.reason)
        );
    }
}

fn print_systematicity(run: &PipelineRun, palette: &ansi::Palette) {
    for point in run.systematicity.curve() {
        println!(
            "  {} {}  {} {}  {} {}",
            palette.paint(format!("{:<18}", point.granularity.name()), ansi::BLUE),
            palette.paint(format!("{:.3}", point.mean_consistency), ansi::GREEN),
            palette.dim("unweighted:"),
            palette.dim(format!("{:.3}", point.unweighted_consistency)),
            palette.dim("groups:"),
            palette.paint(point.groups.to_string(), ansi::YELLOW),
        );
    }
}

fn print_rules(run: &PipelineRun, palette: &ansi::Palette) {
    for tier in Tier::ALL.into_iter().filter(|t| *t != Tier::NoMatch) {
        let rules = run.rules.tier(tier);
        println!(
            "  {} {}",
            palette.paint(format!("{:<14}", tier.name()), ansi::BLUE),
            if rules.is_empty() {
                palette.dim("0 rules")
            } else {
                palette.paint(format!("{} rules", rules.len()), ansi::GREEN)
            }
        );
        for rule in rules.iter().take(TOP_RULES) {
            println!("    {}", fmt_rule_compact(rule, palette));
        }
        if rules.len() > TOP_RULES {
            println!("    {}", palette.dim(format!("... +{} more", rules.len() - TOP_RULES)));
        }
    }
}

fn print_evaluation(run: &PipelineRun, palette: &ansi::Palette) {
    let report = &run.evaluation;
    println!(
        "  {} {}  │  {} {}  │  {} {}",
        palette.paint("events:", ansi::BLUE),
        report.total,
        palette.paint("accuracy:", ansi::BLUE),
        palette.bold(palette.paint(format!("{:.1}%", report.accuracy_pct), ansi::GREEN)),
        palette.paint("coverage:", ansi::BLUE),
        palette.paint(format!("{:.1}%", report.coverage_pct), ansi::YELLOW),
    );

    for tier in report.by_tier.iter().filter(|t| t.hits > 0) {
        println!(
            "    {} {} {}",
            palette.paint(format!("{:<14}", tier.tier.name()), ansi::CYAN),
            palette.dim(format!("{:>6} hits", tier.hits)),
            palette.paint(format!("{:.1}%", tier.accuracy_pct), ansi::GREEN),
        );
    }
    for feature in &report.by_feature {
        println!(
            "    {} {} {} {}",
            palette.paint(format!("{:<18}", feature.feature_id), ansi::BLUE),
            palette.dim(format!("{:>6} events", feature.total)),
            palette.paint(format!("{:.1}%", feature.accuracy_pct), ansi::GREEN),
            palette.dim(format!("covered {:.1}%", feature.coverage_pct)),
        );
    }
}

fn fmt_rule_compact(rule: &Rule, palette: &ansi::Palette) -> String {
    let key = match &rule.kind {
        RuleKind::Lexical { lemma, upos, .. } => format!("{lemma}/{upos}"),
        RuleKind::Morphological { upos, headline_value, .. } => format!("{upos} from {headline_value}"),
        RuleKind::Syntactic { upos, deprel, position, .. } => format!(
            "{upos} {} {}",
            deprel.as_deref().unwrap_or("*"),
            position.map(|p| p.name()).unwrap_or("*")
        ),
        RuleKind::Default { .. } => "*".to_string(),
    };
    format!(
        "{} {} {} {} {}",
        palette.paint(format!("{:<4}", rule.id), ansi::GRAY),
        palette.paint(format!("{}: {key}", rule.kind.feature()), ansi::BLUE),
        palette.bold(palette.paint(format!("→ {}", rule.prediction), ansi::GREEN)),
        palette.paint(format!("{:.2}", rule.confidence), ansi::YELLOW),
        palette.dim(format!("n={}", rule.frequency)),
    )
}
