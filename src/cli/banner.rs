//! Start-of-run banner for interactive terminals.

use std::io::IsTerminal;

struct Colors {
    accent: &'static str,
    title: &'static str,
    subtitle: &'static str,
    reset: &'static str,
}

const COLOR: Colors = Colors {
    accent: "\x1b[38;2;90;200;180m",
    title: "\x1b[1;38;2;220;200;120m",
    subtitle: "\x1b[38;2;100;100;120m",
    reset: "\x1b[0m",
};

const PLAIN: Colors = Colors {
    accent: "",
    title: "",
    subtitle: "",
    reset: "",
};

/// Prints the startup banner to stdout. Renders ANSI colour when stdout is a
/// terminal, falls back to plain text otherwise.
pub fn print_banner(venue_count: usize, dry_run: bool) {
    let c = if std::io::stdout().is_terminal() { &COLOR } else { &PLAIN };
    let a = c.accent;
    let tt = c.title;
    let st = c.subtitle;
    let r = c.reset;

    let mode = if dry_run { "dry-run" } else { "live" };

    println!(
        r#"
{a}  ┌──────────────────────────┐{r}
{a}  │{r}  {tt}arbcore{r}{a}                  │{r}
{a}  │{r}  {st}cross-venue arbitrage{r}{a}     │{r}
{a}  └──────────────────────────┘{r}
  venues: {venue_count}  mode: {mode}
"#
    );
}
