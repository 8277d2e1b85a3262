use crate::kernel::classifier::{Classification, Intensity, UserState};
use crate::kernel::event::SignalSnapshot;
use crate::kernel::session::SessionProfile;

/// Hard ceiling on the page excerpt, whatever the configuration says.
pub const MAX_EXCERPT_CHARS: usize = 800;
pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_GOAL_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are a gentle focus coach inside a study tool. \
You choose at most one small nudge to help the user get back on track. \
You are brief, warm and specific to what the user is reading.";

const RULES: &str = "RULES:\n\
- Never mention cameras, webcams, faces, eyes, posture or any way the user is being observed. \
Talk only about the work and how the user might be feeling.\n\
- Choose exactly one action from the list below.\n\
- Reply with ONLY one JSON object and nothing else.";

const ACTIONS: &str = "ACTIONS (pick exactly one):\n\
{\"type\":\"message\",\"message\":\"<encouraging note, max 200 chars>\"}\n\
{\"type\":\"quiz\",\"quiz\":{\"question\":\"<question about the page>\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"correctIndex\":0,\"explanation\":\"<why>\"}}\n\
{\"type\":\"break\",\"message\":\"<why a break helps now>\"}\n\
{\"type\":\"show_relevance_warning\",\"reason\":\"<how the page relates to the goal>\"}\n\
{\"type\":\"none\"}\n\
A quiz must have exactly 4 options. You may add a short \"reasoning\" field.";

/// Upper bound on the rendered prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize =
    SYSTEM_PROMPT.len() + RULES.len() + ACTIONS.len() + MAX_EXCERPT_CHARS + MAX_TITLE_CHARS + MAX_GOAL_CHARS + 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Plain completion format: `System: ...\nUser: ...\nAssistant:`.
    pub fn render(&self) -> String {
        format!("System: {}\nUser: {}\nAssistant:", self.system, self.user)
    }
}

/// Renders one cycle's signals into a bounded, privacy-safe prompt.
pub fn build_prompt(
    snapshot: &SignalSnapshot,
    classification: &Classification,
    profile: &SessionProfile,
    excerpt_chars: usize,
) -> Prompt {
    let excerpt = clip(&snapshot.content_excerpt, excerpt_chars.min(MAX_EXCERPT_CHARS));
    let title = clip(&snapshot.title, MAX_TITLE_CHARS);
    let content_type = clip(&snapshot.content_type, 40);

    let mut user = String::new();
    user.push_str(&format!(
        "STATE: {} (intensity {})\n",
        state_label(classification.state),
        intensity_label(classification.intensity)
    ));
    user.push_str(&format!(
        "SCORES (0-100): attention {}, distraction {}",
        round_percent(snapshot.attention),
        round_percent(snapshot.distraction)
    ));
    if let Some(sleepiness) = snapshot.sleepiness {
        user.push_str(&format!(", tiredness {}", round_percent(sleepiness)));
    }
    user.push('\n');
    user.push_str(&format!(
        "SESSION: {} min, tab switches {}, scrolls {}, idle {} s\n",
        snapshot.session_seconds / 60,
        snapshot.tab_switches,
        snapshot.scroll_events,
        snapshot.idle_seconds
    ));

    if let Some(goal) = profile.goal.as_deref().map(|g| clip(g, MAX_GOAL_CHARS)).filter(|g| !g.is_empty()) {
        user.push_str(&format!("GOAL: {}\n", goal));
    }
    if !title.is_empty() {
        user.push_str(&format!("PAGE TITLE: {}\n", title));
    }
    if !content_type.is_empty() {
        user.push_str(&format!("CONTENT TYPE: {}\n", content_type));
    }
    if excerpt.is_empty() {
        user.push_str("PAGE EXCERPT: (none)\n");
    } else {
        user.push_str(&format!("PAGE EXCERPT:\n\"\"\"\n{}\n\"\"\"\n", excerpt));
    }

    user.push('\n');
    user.push_str(RULES);
    user.push_str("\n\n");
    user.push_str(ACTIONS);

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Whole percent.
pub fn round_percent(score: f64) -> u8 {
    score.clamp(0.0, 100.0).round() as u8
}

/// Collapses whitespace, strips the excerpt delimiter, then keeps at most
/// `max_chars` characters.
fn clip(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("\"\"\"", "\"").chars().take(max_chars).collect()
}

fn state_label(state: UserState) -> &'static str {
    match state {
        UserState::Focused => "focused",
        UserState::Distracted => "distracted",
        UserState::Fatigued => "tired",
        UserState::Wandering => "mind wandering",
    }
}

fn intensity_label(intensity: Intensity) -> &'static str {
    match intensity {
        Intensity::Low => "low",
        Intensity::Medium => "medium",
        Intensity::High => "high",
        Intensity::Critical => "critical",
    }
}
