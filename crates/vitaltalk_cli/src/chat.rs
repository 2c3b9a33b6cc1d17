//! Interactive terminal session against the orchestrator.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;
use vitaltalk_core::GREETING;
use vitaltalk_reasoning::{Orchestrator, ScoreReport, TurnOutcome};

const HELP: &str = "Commands: /redo  /hint  /feedback  /pause  /quit";

fn print_report(report: &ScoreReport) {
    println!("\n=== Session feedback ===");
    println!("Overall:               {:.1}", report.overall_score);
    println!("Empathy:               {:.1}", report.empathy_score);
    println!("Clarity:               {:.1}", report.clarity_score);
    println!("Emotional alignment:   {:.1}", report.emotional_alignment_score);
    println!("Ethical appropriateness: {:.1}", report.ethical_appropriateness_score);
    println!("Cultural sensitivity:  {:.1}", report.cultural_sensitivity_score);
    if !report.strengths.is_empty() {
        println!("\nStrengths:");
        for s in &report.strengths {
            println!("  + {}", s);
        }
    }
    if !report.areas_for_improvement.is_empty() {
        println!("\nAreas for improvement:");
        for a in &report.areas_for_improvement {
            println!("  - {}", a);
        }
    }
    for s in &report.suggested_responses {
        println!("\nWhen {}:\n  try \"{}\"", s.situation, s.better_response);
    }
    if !report.summary.is_empty() {
        println!("\n{}", report.summary);
    }
}

pub async fn run(orchestrator: Arc<Orchestrator>, scenario_id: u32) -> anyhow::Result<()> {
    let id = Uuid::new_v4().to_string();
    let state = orchestrator.start(&id, scenario_id).await?;
    let relation = state.scenario.family_relationship.clone();

    println!("{}", state.scenario.title);
    println!("{}\n", state.scenario.description);
    println!("{}\n", HELP);
    println!("{} [neutral]: {}\n", relation, GREETING);

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("Doctor> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C detected. Type /quit to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!("Readline error: {}", e);
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        match input {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/redo" => match orchestrator.redo_last_turn(&id).await {
                Ok(s) => println!(
                    "[rewound to turn {}, {} is {}]\n",
                    s.turn_count, relation, s.emotional_state
                ),
                Err(e) => println!("[{}]\n", e),
            },
            "/hint" => match orchestrator.get_coaching_hint(&id).await {
                Ok(hint) => println!("[hint: {:?}] {}\n", hint.quality, hint.feedback),
                Err(e) => println!("[{}]\n", e),
            },
            "/feedback" => match orchestrator.get_final_feedback(&id).await {
                Ok(report) => print_report(&report),
                Err(e) => println!("[{}]\n", e),
            },
            "/pause" => match orchestrator.pause(&id).await {
                Ok(_) => println!("[paused; type anything to continue]\n"),
                Err(e) => println!("[{}]\n", e),
            },
            message => match orchestrator.process_message(&id, message).await {
                Ok(TurnOutcome::Reply(r)) => {
                    println!(
                        "\n{} [{} {}]: {}\n",
                        relation, r.emotional_state, r.emotional_intensity, r.response
                    );
                }
                Ok(TurnOutcome::Rejected { message }) => println!("[{}]\n", message),
                Err(e) => {
                    error!("Turn failed: {}", e);
                    println!("[System Error]: {}\n", e);
                }
            },
        }
    }

    let final_state = orchestrator.complete(&id).await?;
    if final_state.turn_count > 0 {
        let report = orchestrator.get_final_feedback(&id).await?;
        print_report(&report);
    }
    Ok(())
}
