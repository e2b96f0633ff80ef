use crate::infra::in_memory_service;
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::fs::File;
use std::io::Cursor;
use std::path::PathBuf;
use training_nominations::config::AppConfig;
use training_nominations::error::AppError;
use training_nominations::workflows::nomination::{
    Actor, ActorRole, CriteriaDraft, GradeLevel, Location, MemoryStore, ProgramDraft,
};
use training_nominations::workflows::roster::{ImportSummary, RosterImporter};

const SAMPLE_ROLL: &str = "\
Personal Number,Name,GL Range,Directorate,Division,Department,Location,Years of Service Left
NPA1001,Adaeze Okafor,GL 12,Marine & Operations,Pilotage,Harbour Master,HQ,18
NPA1002,Bello Musa Garba,GL 10,Marine & Operations,Pilotage,,LPC,22
NPA1003,Chinedu Eze,GL 08,Engineering,Dredging,Hydrography,ONNE,30
NPA1004,Damilola Adeyemi,GL 14,Finance,Treasury,Payables,HQ,9
NPA1005,Emeka Nwosu,GL 16,Marine & Operations,Pilotage,,HQ,4
NPA1006,Funmilayo Bakare,GL 09,Engineering,Dredging,,TCIPC,35
NPA1007,Garba,GL 10,Finance,Treasury,,HQ,20
NPA1008,Halima Yusuf,GL 13,Human Resources,Training,Learning,CAL,12
";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Nominal roll CSV to use instead of the bundled sample roll
    #[arg(long)]
    pub(crate) roster_csv: Option<PathBuf>,
    /// Training capacity for the demo program
    #[arg(long, default_value_t = 3)]
    pub(crate) capacity: u32,
    /// Program start date (YYYY-MM-DD). Defaults to four weeks from today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct RosterImportArgs {
    /// Nominal roll CSV export
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the import summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_roster_import(args: RosterImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = MemoryStore::new();
    let summary = RosterImporter::from_config(&config.roster).from_path(&args.csv, &store)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&summary).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        println!("Nominal roll: {}", args.csv.display());
        render_import_summary(&summary);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let (service, _) = in_memory_service(&config);
    let trainer = Actor::new("demo.training", ActorRole::TrainingStaff);
    let admin = Actor::new("demo.admin", ActorRole::Admin);

    println!("Training nomination demo");
    let summary = match &args.roster_csv {
        Some(path) => {
            service.import_roster(File::open(path)?, &path.display().to_string(), &admin)?
        }
        None => service.import_roster(Cursor::new(SAMPLE_ROLL), "sample-roll.csv", &admin)?,
    };
    render_import_summary(&summary);

    println!("\nOrganisation");
    for (directorate, divisions) in service.org_hierarchy()?.directorates {
        println!("  {directorate}");
        for (division, departments) in divisions {
            let departments: Vec<String> = departments.into_iter().collect();
            println!("    {division}: {}", departments.join(", "));
        }
    }

    let start = args
        .start
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(28));
    let program = service.create_program(
        ProgramDraft {
            title: "Port Safety and Security Workshop".to_string(),
            start_date: start,
            end_date: start + Duration::days(4),
            venue: "NPA Training School, Bayelsa".to_string(),
            capacity: Some(args.capacity),
            coordinator: Some("Training Directorate".to_string()),
            consultant: None,
            remarks: String::new(),
        },
        &trainer,
    )?;
    println!(
        "\nProgram {} '{}' ({} to {}, {} days, capacity {})",
        program.id,
        program.title,
        program.start_date,
        program.end_date,
        program.duration_days(),
        program.capacity
    );

    let criteria = service.set_criteria(
        &program.id,
        CriteriaDraft {
            grade_level_from: Some(GradeLevel::Gl08),
            grade_level_to: Some(GradeLevel::Gl14),
            locations: vec![Location::All],
            ..CriteriaDraft::default()
        },
        &trainer,
    )?;
    println!(
        "Criteria {}: {} grade levels, at most {} previous trainings, at least {} years of service",
        criteria.id,
        criteria.grade_levels.len(),
        criteria.max_previous_trainings,
        criteria.max_years_of_service
    );

    let nomination = service.generate_nomination(&program.id, &trainer)?;
    println!("\nGenerated {} with {} members", nomination.id, nomination.members.len());
    for member in nomination.sorted_member_ids() {
        println!("  - {member}");
    }

    let candidates = service.search_candidates(&nomination.id, "NPA")?;
    if let Some(candidate) = candidates.first() {
        match service.add_member(&nomination.id, &candidate.staff_id, &trainer) {
            Ok(_) => println!("Added {} ({})", candidate.staff_id, candidate.full_name()),
            Err(err) => println!("Could not add {}: {err}", candidate.staff_id),
        }
    }

    service.submit(&nomination.id, &trainer)?;
    service.approve(&nomination.id, &admin)?;
    println!("Nomination submitted by {} and approved by {}", trainer.username, admin.username);

    let sheet = service.seal_on_first_print(&nomination.id, &trainer)?;
    println!("\nPrinted nomination sheet (seal {})", sheet.digest);
    for member in &sheet.members {
        let grade = member
            .grade_level
            .map(|grade| grade.to_string())
            .unwrap_or_default();
        println!("  {:<10} {:<28} {}", member.staff_id, member.name, grade);
    }

    let reprint = service.seal_on_first_print(&nomination.id, &admin)?;
    let verification = service.verify(&nomination.id)?;
    println!(
        "Re-print tampered: {}; seal valid: {}",
        reprint.tampered, verification.valid
    );

    println!("\nAudit trail");
    for entry in service.audit_trail(&nomination.id)? {
        println!(
            "  {} {:<13} {:<12} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action.label(),
            entry.actor,
            entry.description
        );
    }

    for upload in service.upload_history(&admin)? {
        println!(
            "\nUpload '{}' by {} at {}: {} processed, {} errors",
            upload.file_name,
            upload.uploaded_by,
            upload.uploaded_at.format("%Y-%m-%d %H:%M"),
            upload.processed,
            upload.errors
        );
    }

    let preview = service.reset_preview(&admin)?;
    println!(
        "Reset preview: {} of {} staff records would be deleted, {} protected",
        preview.to_delete, preview.total_staff, preview.protected
    );
    let reset = service.reset_roster(false, &admin)?;
    println!(
        "Roster reset: {} deleted, {} preserved on approved nominations, {} upload records cleared",
        reset.deleted, reset.preserved, reset.uploads_cleared
    );

    Ok(())
}

fn render_import_summary(summary: &ImportSummary) {
    println!(
        "Imported {} rows: {} created, {} updated, {} rejected",
        summary.processed, summary.created, summary.updated, summary.errors
    );
    for rejection in &summary.rejected_rows {
        println!("  row {}: {}", rejection.row, rejection.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use training_nominations::workflows::nomination::StaffDirectory;

    #[test]
    fn sample_roll_imports_with_one_rejection() {
        let store = MemoryStore::new();
        let summary = RosterImporter::new(35, 2025)
            .import(Cursor::new(SAMPLE_ROLL), &store)
            .expect("sample roll parses");

        assert_eq!(summary.processed, 8);
        assert_eq!(summary.created, 7);
        assert_eq!(summary.rejected_rows.len(), 1);
        assert_eq!(summary.rejected_rows[0].row, 8);
        assert_eq!(store.roster().expect("roster").len(), 7);
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 2025-10-06 "),
            Ok(NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date"))
        );
        assert!(parse_date("06/10/2025").is_err());
    }
}
