//! Profile update instruction.
//!
//! The sentinel protocol keeps updates idempotent in the steady state: a
//! model that sees nothing new answers with the sentinel instead of echoing
//! a near-copy of the profile, so repeated runs converge on "no change".

/// Literal response meaning "no profile change needed".
pub const NO_UPDATE_SENTINEL: &str = "NO_UPDATE_NEEDED";

/// Builds the update instruction for one interaction.
///
/// Embeds the current profile and the user's latest prompt, and asks for
/// either the sentinel or a complete replacement profile in the same
/// structure. The model must never receive a blank profile; callers
/// substitute the default skeleton first.
#[must_use]
pub fn build_update_prompt(current_profile: &str, user_prompt: &str) -> String {
    format!(
        "You maintain a short markdown profile of a command-line tool's user. \
It is injected into their future prompts, so keep it factual and compact.\n\
\n\
Current profile:\n\
---\n\
{current_profile}\n\
---\n\
\n\
The user just sent this prompt:\n\
---\n\
{user_prompt}\n\
---\n\
\n\
If the prompt reveals nothing new or lasting about the user, reply with \
exactly {NO_UPDATE_SENTINEL} and nothing else.\n\
Otherwise reply with the complete updated profile, keeping the same section \
structure (Personal Information, Interests, Current Projects, Preferences), \
and nothing else."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_profile_and_user_prompt() {
        let prompt = build_update_prompt("# User Profile\n- Rust dev", "help me with lifetimes");
        assert!(prompt.contains("# User Profile\n- Rust dev"));
        assert!(prompt.contains("help me with lifetimes"));
    }

    #[test]
    fn test_prompt_names_the_sentinel() {
        let prompt = build_update_prompt("p", "q");
        assert!(prompt.contains(NO_UPDATE_SENTINEL));
    }

    #[test]
    fn test_prompt_names_all_sections() {
        let prompt = build_update_prompt("p", "q");
        for section in [
            "Personal Information",
            "Interests",
            "Current Projects",
            "Preferences",
        ] {
            assert!(prompt.contains(section), "missing section {section}");
        }
    }
}
