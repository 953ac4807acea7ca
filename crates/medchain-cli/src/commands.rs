use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::{ColoredString, Colorize};
use medchain_ledger::{
    query, AuditReport, Block, IntegrityVerifier, Ledger, LedgerConfig, LedgerError,
    LedgerReader, LedgerWriter, VerificationResult,
};
use medchain_types::{ConfidenceScore, ForgeryStatus, ForgeryVerdict, TreatmentPayload};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.data_dir)?;
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(config, args, format),
        Command::Append(args) => cmd_append(&open(config)?, args, format),
        Command::Show(args) => cmd_show(&open(config)?, args, format),
        Command::Log(args) => cmd_log(&open(config)?, args, format),
        Command::Verify => cmd_verify(&open(config)?, format),
        Command::Audit => cmd_audit(&open(config)?, format),
        Command::Stats => cmd_stats(&open(config)?, format),
        Command::Backup(args) => cmd_backup(&open(config)?, args, format),
        Command::Backups => cmd_backups(&open(config)?, format),
        Command::Rollback(args) => cmd_rollback(config, args, format),
        Command::Export(args) => cmd_export(&open(config)?, args, format),
        Command::Import(args) => cmd_import(&open(config)?, args, format),
        Command::Find(args) => cmd_find(&open(config)?, args, format),
    }
}

/// Configuration file first, then command-line overrides.
fn resolve_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<LedgerConfig> {
    let mut config = match path {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn open(config: LedgerConfig) -> anyhow::Result<Ledger> {
    let dir = config.data_dir.clone();
    Ledger::open(config).with_context(|| format!("opening ledger in {}", dir.display()))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status_label(status: ForgeryStatus) -> ColoredString {
    match status {
        ForgeryStatus::Original => status.as_str().green(),
        ForgeryStatus::Suspicious => status.as_str().yellow(),
        ForgeryStatus::Fake => status.as_str().red().bold(),
    }
}

fn print_block_line(block: &Block) {
    let p = block.payload();
    println!(
        "{} {} {} {} {} {} {} ({})",
        format!("#{}", block.index()).yellow(),
        block.content_hash().short_hex().dimmed(),
        block.timestamp(),
        p.patient_id.bold(),
        p.medicine,
        p.dosage,
        status_label(p.forgery.status),
        p.forgery.confidence,
    );
}

fn print_broken(index: u64, reason: impl std::fmt::Display) {
    println!(
        "{} Tampering detected at block {}: {}",
        "✗".red().bold(),
        index.to_string().yellow(),
        reason.to_string().red()
    );
}

fn cmd_init(config: LedgerConfig, args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(path) = &args.write_config {
        if path.exists() {
            bail!("refusing to overwrite {}", path.display());
        }
        std::fs::write(path, config.to_toml_string()?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    let ledger = open(config)?;
    let store = ledger.store();
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "data_dir": ledger.config().data_dir,
            "blocks": store.len()?,
            "tail_hash": store.tail_hash()?,
        }));
    }
    println!(
        "{} Ledger ready in {}",
        "✓".green().bold(),
        ledger.config().data_dir.display().to_string().bold()
    );
    println!("  Blocks: {}", store.len()?);
    println!("  Tail:   {}", store.tail_hash()?.to_string().cyan());
    if let Some(path) = &args.write_config {
        println!("  Config: {}", path.display());
    }
    Ok(())
}

fn cmd_append(ledger: &Ledger, args: AppendArgs, format: OutputFormat) -> anyhow::Result<()> {
    let confidence = ConfidenceScore::from_percent(args.confidence)?;
    let payload = TreatmentPayload {
        patient_id: args.patient,
        doctor_id: args.doctor,
        disease: args.disease,
        symptoms: args.symptoms,
        medicine: args.medicine,
        dosage: args.dosage,
        duration: args.duration,
        prescription_file: args.prescription_file,
        forgery: ForgeryVerdict::new(args.status, confidence),
    };
    let block = ledger.store().append(payload)?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(&block)?);
    }
    println!("{} Recorded block {}", "✓".green().bold(), block.index().to_string().yellow());
    println!("  Hash: {}", block.content_hash().to_string().cyan());
    if block.payload().forgery.status != ForgeryStatus::Original {
        println!(
            "  {} prescription classified {}",
            "!".yellow().bold(),
            status_label(block.payload().forgery.status)
        );
    }
    Ok(())
}

fn cmd_show(ledger: &Ledger, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let view = ledger.store().view()?;
    let block = query::block_at(&view, args.index)?;
    let verification = IntegrityVerifier::verify(&view);
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "block": block,
            "verification": verification,
        }));
    }

    let p = block.payload();
    println!("Block {}", block.index().to_string().yellow().bold());
    println!("  Timestamp:     {}", block.timestamp());
    println!("  Patient:       {}", p.patient_id.bold());
    println!("  Doctor:        {}", p.doctor_id);
    println!("  Disease:       {}", p.disease);
    println!("  Symptoms:      {}", p.symptoms);
    println!("  Medicine:      {} {} for {}", p.medicine, p.dosage, p.duration);
    if let Some(file) = &p.prescription_file {
        println!("  Prescription:  {}", file.blue());
    }
    println!(
        "  Forgery check: {} ({})",
        status_label(p.forgery.status),
        p.forgery.confidence
    );
    println!("  Previous hash: {}", block.previous_hash().to_string().dimmed());
    println!("  Content hash:  {}", block.content_hash().to_string().cyan());
    match verification {
        VerificationResult::Valid => println!("  Integrity:     {}", "verified".green()),
        VerificationResult::Broken { index, reason } => {
            print_broken(index, reason);
            if index <= block.index() {
                println!("  {}", "This record cannot be trusted.".red());
            }
        }
    }
    Ok(())
}

fn cmd_log(ledger: &Ledger, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let view = ledger.store().view()?;
    let blocks = query::recent(&view, args.limit);
    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(blocks)?);
    }
    if blocks.is_empty() {
        println!("Ledger is empty.");
    }
    for block in blocks.iter().rev() {
        print_block_line(block);
    }
    Ok(())
}

fn cmd_verify(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let verification = ledger.store().verify()?;
    if format == OutputFormat::Json {
        print_json(&serde_json::to_value(verification)?)?;
    } else if verification.is_valid() {
        println!(
            "{} Ledger intact: {} blocks verified",
            "✓".green().bold(),
            ledger.store().len()?
        );
    }
    match verification {
        VerificationResult::Valid => Ok(()),
        VerificationResult::Broken { index, reason } => {
            if format == OutputFormat::Text {
                print_broken(index, reason);
            }
            bail!("integrity check failed at block {index}")
        }
    }
}

fn print_audit(report: &AuditReport) {
    if report.is_valid() {
        println!(
            "{} No violations in {} blocks",
            "✓".green().bold(),
            report.block_count
        );
        return;
    }
    println!(
        "{} {} violation(s) in {} blocks",
        "✗".red().bold(),
        report.violations.len(),
        report.block_count
    );
    for v in &report.violations {
        println!("  {} {}", format!("#{}", v.index).yellow(), v.reason.to_string().red());
        println!("    expected {}", v.expected.dimmed());
        println!("    actual   {}", v.actual);
    }
}

fn cmd_audit(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let report = ledger.audit()?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&report)?)?,
        OutputFormat::Text => print_audit(&report),
    }
    if !report.is_valid() {
        bail!("audit found {} violation(s)", report.violations.len());
    }
    Ok(())
}

fn cmd_stats(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let summary = ledger.summarize()?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(&summary)?);
    }
    println!("Blocks:   {}", summary.total.to_string().bold());
    for (status, count) in &summary.count_by_status {
        println!("  {:<10} {}", status_label(*status), count);
    }
    println!("Patients: {}", summary.distinct_patients);
    println!("Doctors:  {}", summary.distinct_doctors);
    if let (Some(first), Some(last)) = (summary.earliest_timestamp, summary.latest_timestamp) {
        println!("Span:     {first} .. {last}");
    }
    Ok(())
}

fn cmd_backup(ledger: &Ledger, args: BackupArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = ledger.snapshot(&args.label)?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "id": id, "label": args.label }));
    }
    println!("{} Backup {} ({})", "✓".green().bold(), id.to_string().cyan(), args.label);
    Ok(())
}

fn cmd_backups(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let backups = ledger.backups().list()?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(&backups)?);
    }
    if backups.is_empty() {
        println!("No backups.");
    }
    for b in &backups {
        println!(
            "{}  {}  {:>6} blocks  {}",
            b.id.to_string().cyan(),
            b.created_at,
            b.block_count,
            b.label.bold()
        );
    }
    Ok(())
}

fn cmd_rollback(
    config: LedgerConfig,
    args: RollbackArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let ledger = match Ledger::open(config.clone()) {
        Ok(ledger) => ledger,
        Err(LedgerError::CorruptFormat(reason)) => {
            return cmd_recover(config, args, format, &reason);
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("opening ledger in {}", config.data_dir.display())))
        }
    };
    let rollback = ledger.rollback(args.id)?;
    let verification = ledger.store().verify()?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "restored": args.id,
            "blocks": rollback.chain.len(),
            "pre_rollback": rollback.pre_rollback,
            "verification": verification,
        }));
    }
    println!(
        "{} Restored backup {} ({} blocks)",
        "✓".green().bold(),
        args.id.to_string().cyan(),
        rollback.chain.len()
    );
    println!(
        "  Previous chain saved as {}; roll back to it to undo.",
        rollback.pre_rollback.to_string().cyan()
    );
    if let VerificationResult::Broken { index, reason } = verification {
        print_broken(index, reason);
    }
    Ok(())
}

/// Rollback when the live chain cannot be opened at all.
fn cmd_recover(
    config: LedgerConfig,
    args: RollbackArgs,
    format: OutputFormat,
    reason: &str,
) -> anyhow::Result<()> {
    tracing::warn!(%reason, "live chain unreadable, restoring from backup");
    let (ledger, recovery) = Ledger::recover(config, args.id)?;
    let verification = ledger.store().verify()?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "restored": recovery.restored,
            "blocks": recovery.block_count,
            "preserved": recovery.preserved,
            "verification": verification,
        }));
    }
    println!("{} Live chain was unreadable: {}", "!".yellow().bold(), reason.red());
    println!(
        "{} Restored backup {} ({} blocks)",
        "✓".green().bold(),
        args.id.to_string().cyan(),
        recovery.block_count
    );
    if let Some(key) = &recovery.preserved {
        println!("  Unreadable chain kept as {}", key.dimmed());
    }
    if let VerificationResult::Broken { index, reason } = verification {
        print_broken(index, reason);
    }
    Ok(())
}

fn cmd_export(ledger: &Ledger, args: ExportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let checksum = ledger.export(&args.path)?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "path": args.path, "checksum": checksum }));
    }
    println!(
        "{} Exported {} blocks to {}",
        "✓".green().bold(),
        ledger.store().len()?,
        args.path.display()
    );
    println!("  Checksum: {}", checksum.to_string().cyan());
    Ok(())
}

fn cmd_import(ledger: &Ledger, args: ImportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let import = ledger
        .import_file(&args.path)
        .with_context(|| format!("importing {}", args.path.display()))?;
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "backup": import.backup,
            "blocks": import.blocks,
        }));
    }
    println!(
        "{} Imported {} records",
        "✓".green().bold(),
        import.blocks.len()
    );
    if let Some(backup) = import.backup {
        println!("  Backup before import: {}", backup.to_string().cyan());
    }
    Ok(())
}

fn cmd_find(ledger: &Ledger, args: FindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let view = ledger.store().view()?;
    let found: Vec<&Block> = if let Some(hash) = &args.hash {
        query::find_by_hash(&view, hash).into_iter().collect()
    } else if let Some(patient) = &args.patient {
        query::records_for_patient(&view, patient)
    } else if let Some(doctor) = &args.doctor {
        query::records_by_doctor(&view, doctor)
    } else {
        Vec::new()
    };
    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(&found)?);
    }
    if found.is_empty() {
        println!("No matching records.");
    }
    for block in found {
        print_block_line(block);
    }
    Ok(())
}
