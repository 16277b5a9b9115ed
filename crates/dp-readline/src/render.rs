//! Terminal output for workspace state.

use colored::Colorize;
use dp_application::{ProfileStatus, ProjectLoad, RollbackPhase, WorkspaceView};
use dp_core::file::FileItem;
use dp_core::profile::{DataProfile, QualityGrade};
use dp_core::project::Project;
use dp_core::session::{Delivery, LogEntry, MessageRole};
use dp_core::version::{Version, human_file_size};

pub fn error(message: impl std::fmt::Display) {
    eprintln!("{}", format!("Error: {}", message).red());
}

pub fn notice(message: impl std::fmt::Display) {
    println!("{}", message.to_string().bright_black());
}

pub fn projects(projects: &[Project]) {
    if projects.is_empty() {
        notice("No projects yet. Create one with 'new-project <name>'.");
        return;
    }
    for project in projects {
        println!(
            "  {}  {}  {}",
            project.id.bright_black(),
            project.name.bold(),
            project.description().unwrap_or("")
        );
    }
}

pub fn sessions(view: &WorkspaceView) {
    if view.sessions.is_empty() {
        notice("No sessions. Type a message or '/new' to start one.");
        return;
    }
    let active = view.active_session.as_ref().map(|s| s.id.as_str());
    for (i, session) in view.sessions.iter().enumerate() {
        let marker = if Some(session.id.as_str()) == active { "*" } else { " " };
        println!(
            "{} {:>2}. {}  {}",
            marker.green(),
            i + 1,
            session.display_title(),
            session.updated_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
        );
    }
}

pub fn entry(entry: &LogEntry) {
    let message = &entry.message;
    match message.role {
        MessageRole::User => {
            let status = match &entry.delivery {
                Delivery::Pending => " (sending...)".bright_black().to_string(),
                Delivery::Confirmed => String::new(),
                Delivery::Failed(reason) => format!(" (failed: {})", reason).red().to_string(),
            };
            println!("{}{}", format!("> {}", message.content).green(), status);
        }
        MessageRole::Assistant => {
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
        }
        MessageRole::System => notice(&message.content),
    }
}

pub fn messages(view: &WorkspaceView) {
    if view.history_loading {
        notice("Loading history...");
    }
    for log_entry in &view.messages {
        entry(log_entry);
    }
}

pub fn file_line(file: &FileItem) -> String {
    let size = file.size.map(human_file_size).unwrap_or_default();
    format!("{}  {}", file.name, size)
}

pub fn files(view: &WorkspaceView) {
    if view.files.is_empty() {
        notice("No files. Upload one with '/upload <path>'.");
        return;
    }
    let selected = view.selected_file.as_ref().map(|f| f.path.as_str());
    for (i, file) in view.files.iter().enumerate() {
        let marker = if Some(file.path.as_str()) == selected { "*" } else { " " };
        println!("{} {:>2}. {}", marker.green(), i + 1, file_line(file));
    }
}

fn grade(profile: &DataProfile) -> String {
    let grade = profile.quality.grade();
    let label = format!("{:.1} ({})", profile.quality.score, grade.label());
    match grade {
        QualityGrade::Good => label.green().to_string(),
        QualityGrade::Fair => label.yellow().to_string(),
        QualityGrade::Poor => label.red().to_string(),
    }
}

pub fn profile(status: &ProfileStatus) {
    let snapshot = match status {
        ProfileStatus::Idle => return notice("No file selected."),
        ProfileStatus::Loading => return notice("Profiling..."),
        ProfileStatus::Error(e) => return error(format!("profile unavailable: {}", e.user_message())),
        ProfileStatus::Ready(snapshot) => snapshot,
    };
    let profile = &snapshot.profile;
    println!("{}", snapshot.path.bold());
    println!(
        "  {} rows x {} columns, {}, quality {}",
        profile.shape.rows,
        profile.shape.columns,
        profile.memory_usage,
        grade(profile)
    );
    for issue in &profile.quality.issues {
        println!("  {}", format!("! {}", issue).yellow());
    }
    for (name, stats) in &profile.columns {
        let mut line = format!(
            "  {:<20} {:<10} nulls {:>5.1}%  unique {}",
            name,
            stats.dtype,
            stats.null_ratio() * 100.0,
            stats.unique_count
        );
        if let Some(numeric) = &stats.numeric_stats {
            line.push_str(&format!(
                "  min {} max {} mean {:.2}",
                numeric.min, numeric.max, numeric.mean
            ));
        }
        println!("{}", line);
    }
    if !snapshot.preview.is_empty() {
        println!("{}", "  preview:".bright_black());
        for row in &snapshot.preview {
            println!("  {}", serde_json::Value::Object(row.clone()));
        }
    }
}

pub fn version_line(version: &Version) -> String {
    let mut line = format!(
        "{:<6} {:<9} {}  {}  {}",
        version.label(),
        version.kind().as_str(),
        version.display_message(),
        version.display_author(),
        version.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(metadata) = &version.metadata {
        if let (Some(rows), Some(columns)) = (metadata.rows, metadata.columns) {
            line.push_str(&format!("  {}x{}", rows, columns));
        }
        if let Some(size) = metadata.file_size {
            line.push_str(&format!("  {}", human_file_size(size)));
        }
    }
    line
}

pub fn versions(view: &WorkspaceView) {
    if view.versions.is_empty() {
        notice("No versions yet.");
        return;
    }
    for (i, version) in view.versions.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!("{} {:>2}. {}", marker.green(), i + 1, version_line(version));
    }
}

pub fn status(view: &WorkspaceView) {
    let Some(project_id) = &view.project_id else {
        notice("No project open. Use 'projects' and 'open <id>'.");
        return;
    };
    let name = view.project.as_ref().map_or(project_id.as_str(), |p| p.name.as_str());
    let load = match &view.project_load {
        ProjectLoad::Ready => "ready".green().to_string(),
        ProjectLoad::Loading | ProjectLoad::Idle => "loading".yellow().to_string(),
        ProjectLoad::NotFound => "not found".red().to_string(),
        ProjectLoad::Failed(reason) => format!("failed: {}", reason).red().to_string(),
    };
    println!("{} [{}]", name.bold(), load);
    if let Some(notice_text) = &view.notice {
        println!("  {}", notice_text.yellow());
    }
    println!(
        "  session: {}",
        view.active_session
            .as_ref()
            .map_or("none", |s| s.display_title())
    );
    println!(
        "  file:    {}",
        view.selected_file.as_ref().map_or("none", |f| f.name.as_str())
    );
    if view.upload_in_progress {
        println!("  {}", "upload in progress".yellow());
    } else if let Some(upload_error) = &view.upload_error {
        println!("  {}", format!("last upload failed: {}", upload_error).red());
    }
    println!(
        "  head:    {}",
        view.versions.first().map_or("none".to_string(), Version::label)
    );
    if let Some(target) = view.rollback.target() {
        let phase = match &view.rollback {
            RollbackPhase::Confirming { .. } => "awaiting confirmation".to_string(),
            RollbackPhase::Submitting { .. } => "submitting".to_string(),
            RollbackPhase::Failed { error, .. } => format!("failed: {}", error.user_message()),
            RollbackPhase::Idle => String::new(),
        };
        println!("  rollback to {}: {}", target.label(), phase);
    }
}
