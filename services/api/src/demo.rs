use crate::infra::InMemorySubmissionGateway;
use crate::routes::assessment_type_view;
use assessment_flow::config::AppConfig;
use assessment_flow::error::AppError;
use assessment_flow::workflows::assessment::{
    AssessmentCatalog, AssessmentService, AssessmentTypeId, InMemoryFormStore, NavigationIntent,
    QuestionId, QuestionView, DONT_KNOW_SCORE,
};
use assessment_flow::workflows::import::CsvResponseImporter;
use chrono::Local;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Assessment type to describe. Defaults to the configured default type.
    #[arg(long)]
    pub(crate) assessment_type: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Assessment type to walk. Defaults to the configured default type.
    #[arg(long)]
    pub(crate) assessment_type: Option<String>,
    /// Optional CSV export (question_id,score[,dont_know]) used to pre-fill answers.
    #[arg(long)]
    pub(crate) responses_csv: Option<PathBuf>,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = config.assessment.load_catalog()?;
    let requested = requested_type(&catalog, args.assessment_type);

    if !catalog.is_known_type(&requested) {
        println!(
            "Unknown assessment type '{}'; showing the default ordering.",
            requested
        );
    }

    let view = assessment_type_view(&catalog, &requested);
    println!("{} ({})", view.title, view.id);
    for (index, step) in view.steps.iter().enumerate() {
        let terminal = if step.ends_assessment {
            " | ends assessment"
        } else {
            ""
        };
        println!(
            "  {}. {} [{}] {} question(s){}",
            index + 1,
            step.title,
            step.id,
            step.questions,
            terminal
        );
    }

    let others: Vec<String> = catalog
        .assessment_types()
        .iter()
        .filter(|definition| definition.id.as_str() != view.id)
        .map(|definition| definition.id.to_string())
        .collect();
    if !others.is_empty() {
        println!("Other types: {}", others.join(", "));
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        assessment_type,
        responses_csv,
    } = args;

    let config = AppConfig::load()?;
    let catalog = Arc::new(config.assessment.load_catalog()?);
    let requested = requested_type(&catalog, assessment_type);
    let gateway = Arc::new(InMemorySubmissionGateway::default());
    let service = AssessmentService::new(
        Arc::clone(&catalog),
        Arc::new(InMemoryFormStore::default()),
        Arc::clone(&gateway),
        config.assessment.guidance,
    );

    println!("Assessment flow demo");
    let view = match responses_csv {
        Some(path) => {
            let import = CsvResponseImporter::from_path(&path, &catalog)?;
            println!(
                "- Imported {} response(s) from {} ({} unknown, {} duplicate, {} rejected)",
                import.responses.len(),
                path.display(),
                import.unknown_questions,
                import.duplicates,
                import.rejected_scores
            );
            service.start_with_responses(Some(requested), &import.responses)?
        }
        None => service.start(Some(requested)),
    };
    let session_id = view.session_id.clone();
    println!(
        "- Session {} ({}) started on {}",
        session_id, view.assessment_type, view.category_title
    );

    // One pass per category plus the organization step.
    let max_steps = catalog.total_count(&view.assessment_type) + 1;
    let mut answered = 0usize;
    let mut ready_to_submit = false;
    for _ in 0..max_steps {
        answered += answer_pending(&service, &session_id)?;

        let navigation = service.advance(&session_id)?;
        match navigation.intent {
            NavigationIntent::Advance { .. } => {
                let flow = &navigation.session.flow;
                let guidance = if flow.show_guidance {
                    " | guidance suggested"
                } else {
                    ""
                };
                println!(
                    "- Step {}/{}: {} ({}% complete){}",
                    flow.step,
                    flow.total_steps,
                    navigation.session.category_title,
                    flow.progress_percent,
                    guidance
                );
            }
            NavigationIntent::Submit => {
                ready_to_submit = true;
                break;
            }
            NavigationIntent::Blocked { reason } => {
                println!("- Navigation blocked: {}", reason.summary());
                break;
            }
        }
    }
    println!("- Answered {} question(s) during the walk-through", answered);

    if ready_to_submit {
        let outcome = service.submit(&session_id)?;
        println!(
            "- Submission {} at {} with {} response(s)",
            outcome.status.label(),
            outcome
                .submitted_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            outcome.response_count
        );
        if let Some(notice) = outcome.notice {
            println!("  Notice: {}", notice);
        }
        println!("  Deliveries recorded: {}", gateway.submissions().len());
    }

    let report = service.report(&session_id)?;
    println!("\n{}", report.render_text());

    Ok(())
}

fn requested_type(catalog: &AssessmentCatalog, requested: Option<String>) -> AssessmentTypeId {
    requested
        .map(AssessmentTypeId::new)
        .unwrap_or_else(|| catalog.default_type().clone())
}

/// Answer every visible unanswered question, following any that appear as a
/// result. Returns how many answers were given.
fn answer_pending(
    service: &AssessmentService<InMemoryFormStore, InMemorySubmissionGateway>,
    session_id: &assessment_flow::workflows::assessment::SessionId,
) -> Result<usize, AppError> {
    let mut answered = 0;
    loop {
        let view = service.view(session_id)?;
        let pending: Vec<(QuestionId, i32)> = view
            .questions
            .iter()
            .filter(|question| question.answer.is_none())
            .map(|question| (question.id.clone(), scripted_score(question)))
            .collect();

        if pending.is_empty() {
            return Ok(answered);
        }

        for (question_id, score) in pending {
            service.answer(session_id, &question_id, score)?;
            answered += 1;
        }
    }
}

/// Deterministic answer: "don't know" for roughly one question in four,
/// otherwise the upper-middle option.
fn scripted_score(question: &QuestionView) -> i32 {
    let seed: usize = question.id.as_str().bytes().map(usize::from).sum();
    if seed % 4 == 0 || question.options.is_empty() {
        return DONT_KNOW_SCORE;
    }

    question.options[question.options.len() / 2].value
}
