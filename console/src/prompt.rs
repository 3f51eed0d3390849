use console::style;
use dialoguer::{
    Confirm,
    Input,
    Select,
};
use roistore::prelude::Prompt;

/// Terminal prompt. With `assume_yes` every checkpoint is confirmed without
/// asking, and questions without a yes/no answer are declined.
pub(crate) struct DialoguerPrompt {
    assume_yes: bool,
}

impl DialoguerPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompt for DialoguerPrompt {
    fn confirm(
        &mut self,
        question: &str,
    ) -> bool {
        if self.assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .unwrap_or(false)
    }

    fn choose_genome(
        &mut self,
        missing: &str,
        available: &[String],
    ) -> Option<String> {
        if self.assume_yes || available.is_empty() {
            return None;
        }
        let selected = Select::new()
            .with_prompt(format!(
                "Genome {} is not available. Use instead",
                style(missing).red()
            ))
            .items(available)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()?;
        available.get(selected).cloned()
    }

    fn fix_broken_links(
        &mut self,
        broken: &[String],
    ) -> Vec<(String, String)> {
        if self.assume_yes {
            return Vec::new();
        }
        eprintln!("Paths not found on this machine:");
        for path in broken {
            eprintln!("  {}", style(path).red());
        }
        let mut fixes = Vec::new();
        loop {
            let from: String = Input::new()
                .with_prompt("Prefix to replace (empty to finish)")
                .allow_empty(true)
                .interact_text()
                .unwrap_or_default();
            if from.trim().is_empty() {
                break;
            }
            let to: String = Input::new()
                .with_prompt(format!("Replace {from} with"))
                .interact_text()
                .unwrap_or_default();
            fixes.push((from, to));
        }
        fixes
    }

    fn notify(
        &mut self,
        message: &str,
    ) {
        eprintln!("{}", style(message).red());
    }
}
