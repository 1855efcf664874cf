use anyhow::{anyhow, Result};
use bat::PrettyPrinter;
use cliclack::{input, spinner};
use console::style;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use planner::agent::PlanningAgent;
use planner::artifacts::ArtifactStore;
use planner::delegation::DelegationTask;
use planner::models::message::{Message, MessageHistory};
use planner::models::role::Role;
use planner::plan::{mark_completed, next_open_milestone, parse_milestones, PLAN_ARTIFACT};

pub struct Session {
    agent: PlanningAgent,
    store: Arc<dyn ArtifactStore>,
    delegations: UnboundedReceiver<DelegationTask>,
    messages: MessageHistory,
}

impl Session {
    pub fn new(
        agent: PlanningAgent,
        store: Arc<dyn ArtifactStore>,
        delegations: UnboundedReceiver<DelegationTask>,
    ) -> Self {
        Session {
            agent,
            store,
            delegations,
            messages: MessageHistory::new(),
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        println!(
            "Planner session {}",
            style("- describe the page to plan, type \"exit\" to end the session").dim()
        );
        println!("\n");

        loop {
            let message_text: String =
                match input("Message:").placeholder("").multiline().interact() {
                    Ok(text) => text,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => break,
                    Err(e) => return Err(e.into()),
                };

            if message_text.trim().eq_ignore_ascii_case("exit") {
                break;
            }
            if message_text.trim().is_empty() {
                continue;
            }

            if let Err(e) = self.process_turn(message_text).await {
                if cliclack::log::error(format!("{}", e)).is_err() {
                    eprintln!("Error: {}", e);
                }
            }
            println!("\n");
        }
        Ok(())
    }

    pub async fn headless_start(&mut self, initial_message: String) -> Result<()> {
        self.process_turn(initial_message).await
    }

    async fn process_turn(&mut self, text: String) -> Result<()> {
        self.messages.push(Message::user(text));
        let before = self.messages.len();

        let spin = spinner();
        spin.start("awaiting reply");
        let result = self.agent.reply(&mut self.messages).await;
        spin.stop("");
        let reply = result?;

        // System notices appended by the agent, e.g. artifact updates
        for notice in self.messages[before..]
            .iter()
            .filter(|m| m.role == Role::System)
        {
            println!("{}", style(&notice.content).dim());
        }

        if !reply.is_empty() {
            render(&reply)?;
            self.messages.push(Message::assistant(reply));
        }

        self.report_delegations().await
    }

    async fn report_delegations(&mut self) -> Result<()> {
        while let Ok(task) = self.delegations.try_recv() {
            tracing::info!(request = %task.request, "implementation requested");
            let plan = self.store.read(PLAN_ARTIFACT).await?;
            println!("{}", style(delegation_summary(plan.as_deref())).dim());
        }
        Ok(())
    }
}

/// What the implementation side would pick up next from the saved plan
pub fn delegation_summary(plan: Option<&str>) -> String {
    match plan {
        None => "No plan found.".to_string(),
        Some(plan) => match next_open_milestone(plan) {
            Some(milestone) => format!("Next milestone: {}", milestone.line),
            None => "All milestones are completed.".to_string(),
        },
    }
}

/// Print the milestone checklist of the saved plan
pub async fn print_milestones(store: &dyn ArtifactStore) -> Result<()> {
    match store.read(PLAN_ARTIFACT).await? {
        None => println!("No plan found."),
        Some(plan) => {
            let milestones = parse_milestones(&plan);
            if milestones.is_empty() {
                println!("The plan has no milestones.");
            }
            for milestone in milestones {
                let line = if milestone.completed {
                    style(milestone.line).green().to_string()
                } else {
                    milestone.line
                };
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Check off milestone `number` in the saved plan and return its updated line
pub async fn complete_milestone(store: &dyn ArtifactStore, number: u32) -> Result<String> {
    let plan = store
        .read(PLAN_ARTIFACT)
        .await?
        .ok_or_else(|| anyhow!("No plan found."))?;
    let milestone = parse_milestones(&plan)
        .into_iter()
        .find(|m| m.number == Some(number))
        .ok_or_else(|| anyhow!("The plan has no milestone {}.", number))?;
    if milestone.completed {
        return Ok(milestone.line);
    }

    store
        .write(PLAN_ARTIFACT, &mark_completed(&plan, &milestone.line))
        .await?;
    tracing::info!(milestone = number, "milestone completed");
    Ok(milestone.line.replacen("- [ ]", "- [x]", 1))
}

fn render(content: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .map_err(|e| anyhow!("Failed to render reply: {}", e))?;
    Ok(())
}
