//! What a task body sees while it runs.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::config::{self, ConfigEntry, ConfigValue, Layered, Lookup};
use crate::error::{Result, StagehandError};
use crate::remote::RemoteOutput;
use crate::targets::Target;
use crate::tasks::{Inputs, Task};
use crate::ui::{Prompt, PromptType};

use super::engine::Runtime;
use super::output::CommandOutput;

/// Origin shown for commands run on this machine.
const LOCAL: &str = "local";

/// Handle passed to a task body for one run on one target (or none).
///
/// Every string handed to a command helper is rendered with
/// [`parse`](Self::parse) first, so `{{ name }}` placeholders see the
/// current target's overlay.
///
/// Commands bound to a target (`remote`, `cd`, `upload` and the file
/// helpers) do nothing outside a target run: they print an info line and
/// return an empty output.
pub struct Session<'a> {
    runtime: &'a mut Runtime,
    task: &'a Task,
    target: Option<String>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, task: &'a Task, target: Option<String>) -> Self {
        Self {
            runtime,
            task,
            target,
        }
    }

    /// Name of the running task.
    pub fn task_name(&self) -> &str {
        self.task.name()
    }

    /// The target this run is bound to.
    pub fn current_target(&self) -> Option<&Target> {
        self.target
            .as_deref()
            .and_then(|name| self.runtime.targets.get(name))
    }

    /// Config entry, from the current target's overlay first.
    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.current_target()
            .and_then(|t| t.overlay().get(name))
            .or_else(|| self.runtime.config.get(name))
    }

    /// Whether `name` resolves.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a global value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) {
        self.runtime.config.set(name, value);
    }

    /// Set a global value computed on first read.
    pub fn set_lazy<F, V>(&mut self, name: impl Into<String>, producer: F)
    where
        F: FnOnce() -> V + Send + 'static,
        V: Into<ConfigValue>,
    {
        self.runtime.config.set_lazy(name, producer);
    }

    /// Expand `{{ name }}` placeholders.
    pub fn parse(&self, text: &str) -> Result<String> {
        config::parse(text, &self.layered())
    }

    fn layered(&self) -> Layered<'_> {
        let overlay = self.current_target().map(Target::overlay);
        Layered::new(overlay, &self.runtime.config)
    }

    /// Parsed arguments and options of the dispatch.
    pub fn inputs(&self) -> &Inputs {
        &self.runtime.inputs
    }

    /// An argument's value as text.
    pub fn argument(&self, name: &str) -> Option<String> {
        self.runtime.inputs.string(name)
    }

    /// An option's value as text.
    pub fn option(&self, name: &str) -> Option<String> {
        self.runtime.inputs.string(name)
    }

    /// A boolean option.
    pub fn flag(&self, name: &str) -> bool {
        self.runtime.inputs.flag(name)
    }

    /// Print a line.
    pub fn println(&mut self, text: &str) -> Result<()> {
        let text = self.parse(text)?;
        self.runtime.ui.message(&text);
        Ok(())
    }

    /// Print an informational line.
    pub fn info(&mut self, text: &str) -> Result<()> {
        let text = self.parse(text)?;
        self.runtime.ui.info(&text);
        Ok(())
    }

    /// Print a warning.
    pub fn warning(&mut self, text: &str) -> Result<()> {
        let text = self.parse(text)?;
        self.runtime.ui.warning(&text);
        Ok(())
    }

    /// An error that aborts the task with `message`.
    pub fn fail(&self, message: impl Into<String>) -> StagehandError {
        StagehandError::TaskFailed {
            task: self.task.name().to_string(),
            message: message.into(),
        }
    }

    /// Run a command on this machine through `sh -c`.
    ///
    /// # Errors
    ///
    /// Only when the shell cannot be started; a failing command is reported
    /// in the returned output.
    pub fn local(&mut self, command: &str) -> Result<CommandOutput> {
        let command = self.parse(command)?;
        self.runtime.ui.command(LOCAL, &command);
        let result = crate::shell::execute(&command)?;
        let output = CommandOutput::from(result);
        self.show(LOCAL, &output);
        Ok(output)
    }

    /// Run a command on the current target.
    ///
    /// An unreachable target or a failing command is reported in the
    /// returned output.
    pub fn remote(&mut self, command: &str) -> Result<CommandOutput> {
        let command = self.parse(command)?;
        match self.target_or_notice(&command) {
            Some(name) => self.remote_on(&name, &command),
            None => Ok(CommandOutput::default()),
        }
    }

    /// Start later remote commands on the current target in `path`.
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let path = self.parse(path)?;
        if let Some(name) = self.target_or_notice(&format!("cd {}", path)) {
            tracing::debug!("{}: cd {}", name, path);
            self.runtime.pool.set_cwd(&name, path);
        }
        Ok(())
    }

    /// Export a variable to later remote commands on the current target.
    pub fn export(&mut self, variable: &str, value: &str) -> Result<()> {
        let value = self.parse(value)?;
        if let Some(name) = self.target_or_notice(&format!("export {}", variable)) {
            self.runtime.pool.export(&name, variable, value);
        }
        Ok(())
    }

    /// Copy a local file or directory to the current target.
    pub fn upload(&mut self, local: &str, remote: &str) -> Result<CommandOutput> {
        let local = self.parse(local)?;
        let remote = self.parse(remote)?;
        let shown = format!("upload {} {}", local, remote);
        let Some(name) = self.target_or_notice(&shown) else {
            return Ok(CommandOutput::default());
        };
        self.runtime.ui.command(&name, &shown);
        let output = self.transfer(&name, Transfer::Upload, Path::new(&local), &remote)?;
        self.show(&name, &output);
        Ok(output)
    }

    /// Copy a remote file or directory from the current target.
    pub fn download(&mut self, remote: &str, local: &str) -> Result<CommandOutput> {
        let remote = self.parse(remote)?;
        let local = self.parse(local)?;
        let shown = format!("download {} {}", remote, local);
        let Some(name) = self.target_or_notice(&shown) else {
            return Ok(CommandOutput::default());
        };
        self.runtime.ui.command(&name, &shown);
        let output = self.transfer(&name, Transfer::Download, Path::new(&local), &remote)?;
        self.show(&name, &output);
        Ok(output)
    }

    /// Upload a local file and move it into place with `sudo`.
    pub fn upload_sudo(&mut self, local: &str, destination: &str) -> Result<CommandOutput> {
        let local = self.parse(local)?;
        let destination = self.parse(destination)?;
        match self.target_or_notice(&format!("upload {} {}", local, destination)) {
            Some(name) => self.install_sudo(&name, Path::new(&local), &destination),
            None => Ok(CommandOutput::default()),
        }
    }

    /// Render `source` with `context` and install it remotely with `sudo`.
    pub fn upload_template_string_sudo(
        &mut self,
        source: &str,
        destination: &str,
        context: &impl Lookup,
    ) -> Result<CommandOutput> {
        let rendered = self.compile_template_string(source, context)?;
        let destination = self.parse(destination)?;
        match self.target_or_notice(&format!("upload {}", destination)) {
            Some(name) => self.install_text_sudo(&name, &rendered, &destination),
            None => Ok(CommandOutput::default()),
        }
    }

    /// Render the local template file `source` with `context` and install
    /// it remotely with `sudo`.
    pub fn upload_template_file_sudo(
        &mut self,
        source: &str,
        destination: &str,
        context: &impl Lookup,
    ) -> Result<CommandOutput> {
        let rendered = self.compile_template_file(source, context)?;
        let destination = self.parse(destination)?;
        match self.target_or_notice(&format!("upload {} {}", source, destination)) {
            Some(name) => self.install_text_sudo(&name, &rendered, &destination),
            None => Ok(CommandOutput::default()),
        }
    }

    /// Expand placeholders in `source`, looking in `context` before the
    /// target overlay and the global store.
    pub fn compile_template_string(&self, source: &str, context: &impl Lookup) -> Result<String> {
        let scoped = Scoped {
            context,
            base: self.layered(),
        };
        config::parse(source, &scoped)
    }

    /// Read the local file `source` and expand it like
    /// [`compile_template_string`](Self::compile_template_string).
    pub fn compile_template_file(&self, source: &str, context: &impl Lookup) -> Result<String> {
        let path = self.parse(source)?;
        let text = fs::read_to_string(&path)?;
        self.compile_template_string(&text, context)
    }

    /// Render the local template file `source` into the local file
    /// `destination`. The file is replaced atomically.
    pub fn local_template_file(
        &mut self,
        source: &str,
        destination: &str,
        context: &impl Lookup,
    ) -> Result<()> {
        let rendered = self.compile_template_file(source, context)?;
        let destination = self.parse(destination)?;
        self.runtime
            .ui
            .command(LOCAL, &format!("render {} > {}", source, destination));

        let target = Path::new(&destination);
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(rendered.as_bytes())?;
        file.persist(target).map_err(|e| StagehandError::Io(e.error))?;
        Ok(())
    }

    /// Replace every `search` in the remote `file` with `replace`.
    pub fn replace_in_remote_file(&mut self, file: &str, search: &str, replace: &str) -> Result<CommandOutput> {
        let replace = self.parse(replace)?;
        self.edit_remote_file(file, |content| content.replace(search, &replace))
    }

    /// Append `text` to the remote `file`.
    pub fn add_in_remote_file(&mut self, text: &str, file: &str) -> Result<CommandOutput> {
        let text = self.parse(text)?;
        self.edit_remote_file(file, |content| content + &text)
    }

    /// Cut every `text` out of the remote `file`.
    pub fn remove_from_remote_file(&mut self, text: &str, file: &str) -> Result<CommandOutput> {
        let text = self.parse(text)?;
        self.edit_remote_file(file, |content| content.replace(&text, ""))
    }

    /// Whether the remote `file` contains a line matching `text`.
    pub fn is_in_remote_file(&mut self, text: &str, file: &str) -> Result<bool> {
        let output = self.remote(&format!(
            "if [ \"`sudo cat {} | grep '{}'`\" ]; then echo 'true'; fi",
            file,
            text.trim()
        ))?;
        Ok(output.bool())
    }

    /// Run `commands` on the current target when `condition` holds there.
    pub fn run_if(&mut self, condition: &str, commands: &str) -> Result<CommandOutput> {
        self.remote(&format!("if {}; then {}; fi", condition, commands))
    }

    /// [`run_if`](Self::run_if) for each `(condition, commands)` pair, in order.
    pub fn run_ifs(&mut self, checks: &[(&str, &str)]) -> Result<Vec<CommandOutput>> {
        checks
            .iter()
            .map(|(condition, commands)| self.run_if(condition, commands))
            .collect()
    }

    /// Run `commands` on the current target when `binary` is not installed.
    pub fn run_if_no_binary(&mut self, binary: &str, commands: &str) -> Result<CommandOutput> {
        self.remote(&format!(
            "if [ ! -e \"`which {}`\" ]; then {}; fi",
            binary, commands
        ))
    }

    /// [`run_if_no_binary`](Self::run_if_no_binary) for each
    /// `(binary, commands)` pair, in order.
    pub fn run_if_no_binaries(&mut self, installs: &[(&str, &str)]) -> Result<Vec<CommandOutput>> {
        installs
            .iter()
            .map(|(binary, commands)| self.run_if_no_binary(binary, commands))
            .collect()
    }

    /// Whether `command` is available on the current target.
    pub fn command_exists(&mut self, command: &str) -> Result<bool> {
        let output = self.remote(&format!(
            "if hash {} 2>/dev/null; then echo 'true'; fi",
            command
        ))?;
        Ok(output.bool())
    }

    /// Ask for free text; an empty answer yields `default`.
    pub fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        let mut prompt = Prompt::new(self.parse(question)?, PromptType::Input);
        if !default.is_empty() {
            prompt = prompt.with_default(default);
        }
        let answer = self.runtime.ui.prompt(&prompt)?.as_string();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Ask a yes/no question.
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let prompt = Prompt::new(self.parse(question)?, PromptType::Confirm)
            .with_default(if default { "y" } else { "n" });
        let answer = self.runtime.ui.prompt(&prompt)?;
        Ok(answer.as_bool().unwrap_or(default))
    }

    /// Pick any number of `choices`, with `defaults` preselected.
    pub fn choose(&mut self, question: &str, choices: &[&str], defaults: &[&str]) -> Result<Vec<String>> {
        let prompt = Prompt::new(
            self.parse(question)?,
            PromptType::MultiSelect {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
        );
        let prompt = if defaults.is_empty() {
            prompt
        } else {
            prompt.with_default(defaults.join(","))
        };
        Ok(self.runtime.ui.prompt(&prompt)?.into_strings())
    }

    /// The current target, or `None` after telling the user that `command`
    /// needs one.
    fn target_or_notice(&mut self, command: &str) -> Option<String> {
        if self.target.is_none() {
            self.runtime.ui.info(&format!(
                "Command `{}` can run only on [{}]",
                command,
                self.task.only_on().join(", ")
            ));
        }
        self.target.clone()
    }

    fn remote_on(&mut self, name: &str, command: &str) -> Result<CommandOutput> {
        self.runtime.ui.command(name, command);
        let output = CommandOutput::from(self.run_raw(name, command)?);
        self.show(name, &output);
        Ok(output)
    }

    fn run_raw(&mut self, name: &str, command: &str) -> Result<RemoteOutput> {
        let runtime = &mut *self.runtime;
        let target = runtime
            .targets
            .get(name)
            .ok_or_else(|| no_target("remote"))?;
        unreachable_as_output(runtime.pool.run(target, command))
    }

    fn transfer(&mut self, name: &str, direction: Transfer, local: &Path, remote: &str) -> Result<CommandOutput> {
        let runtime = &mut *self.runtime;
        let target = runtime
            .targets
            .get(name)
            .ok_or_else(|| no_target("transfer"))?;
        let result = match direction {
            Transfer::Upload => runtime.pool.upload(target, local, remote),
            Transfer::Download => runtime.pool.download(target, remote, local),
        };
        unreachable_as_output(result).map(CommandOutput::from)
    }

    /// Upload `local` to a scratch path, then `sudo mv` it to `destination`.
    fn install_sudo(&mut self, name: &str, local: &Path, destination: &str) -> Result<CommandOutput> {
        let staged = scratch_path(name, destination);
        self.runtime
            .ui
            .command(name, &format!("upload {} {}", local.display(), staged));
        let sent = self.transfer(name, Transfer::Upload, local, &staged)?;
        if sent.has_error() {
            self.show(name, &sent);
            return Ok(sent);
        }
        self.remote_on(name, &format!("sudo mv {} {}", staged, destination))
    }

    fn install_text_sudo(&mut self, name: &str, text: &str, destination: &str) -> Result<CommandOutput> {
        let mut scratch = NamedTempFile::new()?;
        scratch.write_all(text.as_bytes())?;
        scratch.flush()?;
        self.install_sudo(name, scratch.path(), destination)
    }

    /// Read `file` with `sudo`, rewrite it locally and install the result.
    fn edit_remote_file<F>(&mut self, file: &str, edit: F) -> Result<CommandOutput>
    where
        F: FnOnce(String) -> String,
    {
        let file = self.parse(file)?;
        let Some(name) = self.target_or_notice(&format!("edit {}", file)) else {
            return Ok(CommandOutput::default());
        };

        let read = format!("sudo cat {}", file);
        self.runtime.ui.command(&name, &read);
        let current = self.run_raw(&name, &read)?;
        if current.exit_error.is_some() {
            let output = CommandOutput::from(current);
            self.show(&name, &output);
            return Ok(output);
        }

        let edited = edit(current.stdout);
        self.install_text_sudo(&name, &edited, &file)
    }

    fn show(&mut self, origin: &str, output: &CommandOutput) {
        if let Some(error) = &output.error {
            tracing::debug!("[{}] {}", origin, error);
        }
        self.runtime
            .ui
            .output(origin, output.display(), output.has_error());
    }
}

#[derive(Debug, Clone, Copy)]
enum Transfer {
    Upload,
    Download,
}

/// A caller's context above the session's own lookup.
struct Scoped<'a, C: Lookup> {
    context: &'a C,
    base: Layered<'a>,
}

impl<C: Lookup> Lookup for Scoped<'_, C> {
    fn lookup(&self, name: &str) -> Option<&ConfigEntry> {
        self.context
            .lookup(name)
            .or_else(|| self.base.lookup(name))
    }
}

fn unreachable_as_output(result: Result<RemoteOutput>) -> Result<RemoteOutput> {
    match result {
        Err(e @ StagehandError::Unreachable { .. }) => Ok(RemoteOutput::failed("", e.to_string())),
        other => other,
    }
}

/// A remote `/tmp` path unique to this process, target and destination.
fn scratch_path(target: &str, destination: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seed = format!(
        "{}:{}:{}:{}:{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        COUNTER.fetch_add(1, Ordering::Relaxed),
        target,
        destination
    );
    let hash = Sha256::digest(seed.as_bytes());
    format!("/tmp/stagehand-{}", hex::encode(&hash[..8]))
}

fn no_target(operation: &str) -> StagehandError {
    StagehandError::NoActiveTarget {
        operation: operation.to_string(),
    }
}
