use crate::OutputFormat;
use anyhow::Context as _;
use knowbase::auth::{CredentialCheck, hash_secret};
use knowbase::config::{self, KbConfig};
use knowbase::server::{self, AppState};
use knowbase::ui::{self, Icons};
use knowbase::Repository;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn emit_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Empty text on the command line clears an optional field
fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn run_hash_secret(format: OutputFormat, salt: &str, secret: &str) -> anyhow::Result<()> {
    let hash = hash_secret(salt, secret);
    if format.is_human() {
        ui::success("Add this to knowbase.toml:");
        println!();
        println!("[admin]");
        println!("salt = {:?}", salt);
        println!("hash = {:?}", hash);
    } else {
        emit_json(&serde_json::json!({ "salt": salt, "hash": hash }))?;
    }
    Ok(())
}

pub fn run_init(
    format: OutputFormat,
    config_path: Option<&Path>,
    database: Option<&Path>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    let config = KbConfig {
        database: Some(
            database
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| config::DEFAULT_DATABASE.to_string()),
        ),
        cache_ttl_secs: Some(300),
        cache_max_entries: Some(knowbase::cache::DEFAULT_MAX_ENTRIES),
        recent_sections: Some(3),
        recent_questions: Some(5),
        utc_offset_hours: Some(config::DEFAULT_UTC_OFFSET_HOURS),
        port: Some(config::DEFAULT_PORT),
        ..Default::default()
    };

    config::write_config(&path, &config, force)?;
    let repo = config.open_repository()?;
    let stats = repo.stats()?;

    if format.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::info("Database", &config.database_path().display().to_string());
        ui::summary_row("Sections:", &stats.sections.to_string());
        ui::summary_row("Questions:", &stats.questions.to_string());
        println!();
        ui::warn("Admin commands stay disabled until an [admin] table is configured");
        println!(
            "{} Run {} to generate one",
            Icons::KEY,
            "knowbase hash-secret <secret>".bold()
        );
    } else {
        emit_json(&serde_json::json!({
            "config": path,
            "database": config.database_path(),
            "stats": stats,
        }))?;
    }
    Ok(())
}

/// Everything a content command needs: the repository, the admin gate and
/// how to print results.
pub struct Context {
    config: KbConfig,
    repo: Repository,
    gate: Arc<dyn CredentialCheck>,
    format: OutputFormat,
    admin_secret: Option<String>,
}

impl Context {
    pub fn load(
        config_path: Option<&Path>,
        database: Option<&Path>,
        format: OutputFormat,
        admin_secret: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = config::load_config(config_path)?.unwrap_or_default();
        if let Some(db) = database {
            config.database = Some(db.to_string_lossy().into_owned());
        }
        tracing::debug!("Using database {:?}", config.database_path());

        let repo = config
            .open_repository()
            .with_context(|| format!("failed to open {}", config.database_path().display()))?;
        let gate = config.credential_check()?;

        Ok(Self {
            config,
            repo,
            gate,
            format,
            admin_secret,
        })
    }

    fn require_admin(&self) -> anyhow::Result<()> {
        let Some(secret) = self.admin_secret.as_deref() else {
            anyhow::bail!("admin secret required (use --admin-secret or KNOWBASE_ADMIN_SECRET)");
        };
        if !self.gate.verify(secret) {
            tracing::warn!("Admin secret rejected");
            anyhow::bail!("admin secret rejected");
        }
        Ok(())
    }

    fn offset(&self) -> i32 {
        self.config.utc_offset_hours()
    }

    // ========== Browsing ==========

    pub fn run_sections(&self) -> anyhow::Result<()> {
        let sections = self.repo.list_sections()?;
        let mut rows = Vec::with_capacity(sections.len());
        for section in sections {
            let count = self.repo.count_questions_in(section.id)?;
            rows.push((section, count));
        }

        if !self.format.is_human() {
            let data: Vec<_> = rows
                .iter()
                .map(|(section, questions)| {
                    serde_json::json!({ "section": section, "questions": questions })
                })
                .collect();
            return emit_json(&data);
        }

        ui::header("Sections");
        if rows.is_empty() {
            println!("{} No sections yet.", Icons::INFO);
        } else {
            println!("{}", ui::sections_table(&rows, self.offset()));
        }
        Ok(())
    }

    pub fn run_show(&self, id: i64) -> anyhow::Result<()> {
        let Some(section) = self.repo.get_section(id)? else {
            anyhow::bail!("section {} not found", id);
        };
        let questions = self.repo.list_questions(id)?;

        if !self.format.is_human() {
            return emit_json(&serde_json::json!({ "section": section, "questions": questions }));
        }

        ui::section_line(&section, Some(questions.len()), self.offset());
        if questions.is_empty() {
            println!();
            println!("{} No questions in this section yet.", Icons::INFO);
        }
        for question in &questions {
            ui::section(&format!("{} #{}", Icons::QUESTION, question.id));
            ui::question_pane(&question.question);
            ui::answer_pane(question.answer.as_deref());
            ui::info_pane(question.info.as_deref());
        }
        Ok(())
    }

    pub fn run_search(&self, query: &str) -> anyhow::Result<()> {
        let hits = self.repo.search(query)?;

        if !self.format.is_human() {
            return emit_json(&hits);
        }

        println!("{} Results for '{}'", Icons::SEARCH, query.trim());
        if hits.is_empty() {
            println!("{} Nothing found.", Icons::CROSS);
            return Ok(());
        }
        for hit in &hits {
            println!();
            ui::hit_line(hit, self.offset());
            ui::question_pane(&hit.question.question);
            ui::answer_pane(hit.question.answer.as_deref());
            ui::info_pane(hit.question.info.as_deref());
        }
        Ok(())
    }

    pub fn run_recent(&self, sections: Option<usize>, questions: Option<usize>) -> anyhow::Result<()> {
        let sections = self
            .repo
            .recent_sections(sections.unwrap_or(self.config.recent_sections()))?;
        let questions = self
            .repo
            .recent_questions(questions.unwrap_or(self.config.recent_questions()))?;

        if !self.format.is_human() {
            return emit_json(&serde_json::json!({ "sections": sections, "questions": questions }));
        }

        if !sections.is_empty() {
            ui::section(&format!("{} Recently added sections", Icons::INBOX));
            for section in &sections {
                let count = self.repo.count_questions_in(section.id)?;
                ui::section_line(section, Some(count), self.offset());
            }
        }
        if !questions.is_empty() {
            ui::section(&format!("{} Latest questions", Icons::NEW));
            for hit in &questions {
                ui::hit_line(hit, self.offset());
                let answer = hit.question.answer.as_deref().map(|a| ui::preview(a, 200));
                ui::answer_pane(answer.as_deref());
            }
        }
        if sections.is_empty() && questions.is_empty() {
            println!("{} Nothing added yet.", Icons::INFO);
        }
        Ok(())
    }

    pub fn run_stats(&self) -> anyhow::Result<()> {
        let stats = self.repo.stats()?;

        if !self.format.is_human() {
            return emit_json(&stats);
        }

        println!(
            "{} Knowbase Statistics ({})",
            Icons::STATS,
            self.repo.store().path().display()
        );
        println!("{}", ui::stats_table(&stats));
        Ok(())
    }

    // ========== Admin ==========

    pub fn run_add_section(&self, title: &str, description: Option<String>) -> anyhow::Result<()> {
        self.require_admin()?;
        let description = blank_to_none(description);
        let section = self.repo.add_section(title, description.as_deref())?;

        if self.format.is_human() {
            ui::success(&format!("Section '{}' created (#{})", section.title, section.id));
            Ok(())
        } else {
            emit_json(&section)
        }
    }

    pub fn run_edit_section(
        &self,
        id: i64,
        title: Option<String>,
        description: Option<String>,
    ) -> anyhow::Result<()> {
        self.require_admin()?;
        let Some(current) = self.repo.get_section(id)? else {
            anyhow::bail!("section {} not found", id);
        };

        let title = title.unwrap_or(current.title);
        let description = match description {
            Some(text) => blank_to_none(Some(text)),
            None => current.description,
        };
        let section = self.repo.update_section(id, &title, description.as_deref())?;

        if self.format.is_human() {
            ui::success(&format!("Section #{} updated", section.id));
            Ok(())
        } else {
            emit_json(&section)
        }
    }

    pub fn run_rm_section(&self, id: i64) -> anyhow::Result<()> {
        self.require_admin()?;
        let removed = self.repo.delete_section(id)?;

        if self.format.is_human() {
            println!(
                "{} Section #{} deleted with {} question(s)",
                Icons::DEL,
                id,
                removed
            );
            Ok(())
        } else {
            emit_json(&serde_json::json!({ "id": id, "questions_removed": removed }))
        }
    }

    pub fn run_add_question(
        &self,
        section_id: i64,
        question: &str,
        answer: Option<String>,
        info: Option<String>,
    ) -> anyhow::Result<()> {
        self.require_admin()?;
        let answer = blank_to_none(answer);
        let info = blank_to_none(info);
        let added = self
            .repo
            .add_question(section_id, question, answer.as_deref(), info.as_deref())?;

        if self.format.is_human() {
            ui::success(&format!("Question #{} added to section #{}", added.id, section_id));
            Ok(())
        } else {
            emit_json(&added)
        }
    }

    pub fn run_edit_question(
        &self,
        id: i64,
        question: Option<String>,
        answer: Option<String>,
        info: Option<String>,
    ) -> anyhow::Result<()> {
        self.require_admin()?;
        let Some(current) = self.repo.get_question(id)? else {
            anyhow::bail!("question {} not found", id);
        };

        let question = question.unwrap_or(current.question);
        let answer = match answer {
            Some(text) => blank_to_none(Some(text)),
            None => current.answer,
        };
        let info = match info {
            Some(text) => blank_to_none(Some(text)),
            None => current.info,
        };
        let updated = self
            .repo
            .update_question(id, &question, answer.as_deref(), info.as_deref())?;

        if self.format.is_human() {
            ui::success(&format!("Question #{} saved", updated.id));
            Ok(())
        } else {
            emit_json(&updated)
        }
    }

    pub fn run_rm_question(&self, id: i64) -> anyhow::Result<()> {
        self.require_admin()?;
        self.repo.delete_question(id)?;

        if self.format.is_human() {
            println!("{} Question #{} deleted", Icons::DEL, id);
            Ok(())
        } else {
            emit_json(&serde_json::json!({ "id": id, "deleted": true }))
        }
    }

    // ========== Server ==========

    pub fn run_serve(self, port: Option<u16>, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
        let port = port.unwrap_or(self.config.port());
        let static_dir = static_dir.or_else(|| self.config.static_dir.as_ref().map(PathBuf::from));
        let state = AppState {
            recent_sections: self.config.recent_sections(),
            recent_questions: self.config.recent_questions(),
            repo: self.repo,
            gate: self.gate,
        };

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(server::start_server(port, state, static_dir))
    }
}
