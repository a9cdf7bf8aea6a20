//! Argument groups shared by several subcommands.

use clap::{Args, ValueEnum};
use surfacer_core::alert::ButtonRole;
use surfacer_core::config::SurfacerConfig;
use surfacer_core::driver::Selector;
use surfacer_core::obstruction::{AppContext, Obstruction};

/// Which chrome to subtract from the container.
#[derive(Args, Debug, Default)]
pub struct ObstructionArgs {
    /// Subtract the navigation bar from the top of the container
    #[arg(long)]
    pub nav_bar: bool,

    /// Subtract the keyboard from the bottom of the container
    #[arg(long)]
    pub keyboard: bool,

    /// Subtract another element, e.g. `type:Toolbar:bottom` (repeatable)
    #[arg(long = "obstruct", value_name = "SELECTOR:EDGE", value_parser = parse_obstruction)]
    pub custom: Vec<Obstruction>,

    /// Only look for obstructions below this element (usually the app)
    #[arg(long, value_name = "SELECTOR")]
    pub scope: Option<Selector>,
}

impl ObstructionArgs {
    /// Navigation bar first, then keyboard, then custom obstructions in the
    /// order given.
    pub fn obstructions(&self) -> Vec<Obstruction> {
        let mut out = Vec::with_capacity(self.custom.len() + 2);
        if self.nav_bar {
            out.push(Obstruction::NavigationBar);
        }
        if self.keyboard {
            out.push(Obstruction::Keyboard);
        }
        out.extend(self.custom.iter().cloned());
        out
    }

    /// `base` with the scope overridden when `--scope` was given.
    pub fn context(&self, base: &AppContext) -> AppContext {
        let mut context = base.clone();
        if let Some(scope) = &self.scope {
            context.scope = Some(scope.clone());
        }
        context
    }
}

/// Parses `<selector>:<edge>`. The edge is taken after the last colon so
/// selectors such as `label:Done` keep theirs.
pub fn parse_obstruction(s: &str) -> Result<Obstruction, String> {
    let (selector, edge) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected <selector>:<edge>, got '{}'", s))?;
    Ok(Obstruction::custom(selector.parse()?, edge.parse()?))
}

/// Overrides for the persisted search tuning.
#[derive(Args, Debug, Default)]
pub struct TuningArgs {
    /// Horizontal swipe cap as a fraction of the scrollable width
    #[arg(long, value_name = "FRACTION")]
    pub max_swipe_x: Option<f64>,

    /// Vertical swipe cap as a fraction of the scrollable height
    #[arg(long, value_name = "FRACTION")]
    pub max_swipe_y: Option<f64>,

    /// Drag duration in milliseconds
    #[arg(long, value_name = "MS")]
    pub hold_ms: Option<u64>,

    /// Minimum progress per swipe in points
    #[arg(long, value_name = "POINTS")]
    pub stall_tolerance: Option<f64>,

    /// Give up after this many milliseconds
    #[arg(short = 'o', long, value_name = "MS", env = "SURFACER_TIMEOUT")]
    pub timeout_ms: Option<u64>,
}

impl TuningArgs {
    pub fn apply(&self, config: &mut SurfacerConfig) {
        if let Some(v) = self.max_swipe_x {
            config.max_swipe_fraction_x = v;
        }
        if let Some(v) = self.max_swipe_y {
            config.max_swipe_fraction_y = v;
        }
        if let Some(v) = self.hold_ms {
            config.hold_duration_ms = v;
        }
        if let Some(v) = self.stall_tolerance {
            config.stall_tolerance = v;
        }
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }
    }
}

/// Button roles accepted by `classify-alert --respond`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Allow,
    AllowOnce,
    Deny,
    Accept,
    Cancel,
}

impl From<RoleArg> for ButtonRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Allow => ButtonRole::Allow,
            RoleArg::AllowOnce => ButtonRole::AllowOnce,
            RoleArg::Deny => ButtonRole::Deny,
            RoleArg::Accept => ButtonRole::Accept,
            RoleArg::Cancel => ButtonRole::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfacer_core::obstruction::Edge;

    #[test]
    fn obstruction_with_label_selector() {
        let o = parse_obstruction("label:Done:bottom").unwrap();
        assert_eq!(o, Obstruction::custom(Selector::label("Done"), Edge::Bottom));
    }

    #[test]
    fn obstruction_with_type_selector() {
        let o = parse_obstruction("type:Toolbar:Bottom").unwrap();
        assert_eq!(o, Obstruction::custom(Selector::of_type("Toolbar"), Edge::Bottom));
    }

    #[test]
    fn obstruction_requires_edge() {
        assert!(parse_obstruction("toolbar").is_err());
        assert!(parse_obstruction("toolbar:middle").is_err());
        assert!(parse_obstruction(":top").is_err());
    }

    #[test]
    fn obstructions_keep_chrome_first() {
        let args = ObstructionArgs {
            nav_bar: true,
            keyboard: true,
            custom: vec![parse_obstruction("tabs:bottom").unwrap()],
            scope: None,
        };
        let list = args.obstructions();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], Obstruction::NavigationBar);
        assert_eq!(list[1], Obstruction::Keyboard);
        assert_eq!(list[2].edge(), Edge::Bottom);
    }

    #[test]
    fn scope_overrides_config_context() {
        let base = AppContext {
            keyboard_type: "SoftKeyboard".to_string(),
            ..AppContext::default()
        };
        let args = ObstructionArgs {
            scope: Some(Selector::id("com.example.app")),
            ..ObstructionArgs::default()
        };
        let context = args.context(&base);
        assert_eq!(context.scope, Some(Selector::id("com.example.app")));
        assert_eq!(context.keyboard_type, "SoftKeyboard");
        assert_eq!(ObstructionArgs::default().context(&base), base);
    }

    #[test]
    fn tuning_overrides_only_given_values() {
        let mut config = SurfacerConfig {
            stall_tolerance: 3.0,
            ..SurfacerConfig::default()
        };
        TuningArgs {
            max_swipe_y: Some(0.5),
            timeout_ms: Some(2000),
            ..TuningArgs::default()
        }
        .apply(&mut config);
        assert_eq!(config.max_swipe_fraction_y, 0.5);
        assert_eq!(config.max_swipe_fraction_x, 0.7);
        assert_eq!(config.stall_tolerance, 3.0);
        assert_eq!(config.timeout_ms, Some(2000));
    }
}
