use anyhow::{Result, bail};
use hexformat_config::Config;
use hexformat_engine::{
    Cmd, Document, DocumentOptions, EditorEvent, Patch, SegmentId, Snapshot, StructNameRequest,
};
use ratatui::widgets::ListState;
use std::{fs::File, io::BufReader, path::PathBuf};

use crate::view::HexView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Segments,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    Split,
    Array,
    Separate,
}

/// A pending command that needs text from the user
#[derive(Debug)]
pub enum Prompt {
    Rename(SegmentId),
    StructName(StructNameRequest),
    ApplyStruct(SegmentId),
    DisplayFormat(SegmentId),
    Chunk { target: SegmentId, mode: ChunkMode },
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::Rename(_) => "New name",
            Prompt::StructName(_) => "Struct name",
            Prompt::ApplyStruct(_) => "Struct to apply",
            Prompt::DisplayFormat(_) => "Display format",
            Prompt::Chunk {
                mode: ChunkMode::Split,
                ..
            } => "Split by format (<format> [chunk bytes])",
            Prompt::Chunk {
                mode: ChunkMode::Array,
                ..
            } => "Array of (<format> [chunk bytes])",
            Prompt::Chunk {
                mode: ChunkMode::Separate,
                ..
            } => "Separate by format (<format> [chunk bytes])",
        }
    }
}

pub struct App {
    pub bytes: Vec<u8>,
    pub layout_path: PathBuf,
    pub doc: Document,
    pub snapshot: Snapshot,
    pub list_state: ListState,
    pub view: HexView,
    pub focus: Focus,
    pub prompt: Option<(Prompt, String)>,
    pub status: String,
}

impl App {
    pub fn new(binary_path: PathBuf, layout_path: Option<PathBuf>, config: &Config) -> Result<Self> {
        let bytes = std::fs::read(&binary_path)?;
        let file_size = bytes.len() as u64;
        let options = DocumentOptions {
            root_name: config.root_segment_name.clone(),
            name_prefix: config.auto_name_prefix.clone(),
        };
        let mut doc = Document::with_options(file_size, options);

        let explicit = layout_path.is_some();
        let layout_path = layout_path.unwrap_or_else(|| config.layout_path_for(&binary_path));
        if explicit || layout_path.exists() {
            doc.read_layout(BufReader::new(File::open(&layout_path)?))?;
            if doc.file_size() != file_size {
                bail!(
                    "layout '{}' describes {} bytes but '{}' has {}",
                    layout_path.display(),
                    doc.file_size(),
                    binary_path.display(),
                    file_size
                );
            }
            log::info!("loaded layout from {}", layout_path.display());
        }

        let snapshot = doc.snapshot();
        let mut app = Self {
            bytes,
            layout_path,
            doc,
            snapshot,
            list_state: ListState::default(),
            view: HexView::new(file_size, config.column_width),
            focus: Focus::Segments,
            prompt: None,
            status: String::new(),
        };
        app.drain_events();
        if !app.snapshot.segments.is_empty() {
            app.list_state.select(Some(0));
        }
        Ok(app)
    }

    pub fn selected_segment(&self) -> Option<SegmentId> {
        self.list_state
            .selected()
            .and_then(|index| self.snapshot.segments.get(index))
            .map(|view| view.id)
    }

    pub fn next_segment(&mut self) {
        if self.snapshot.segments.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.snapshot.segments.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_segment(&mut self) {
        if self.snapshot.segments.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.snapshot.segments.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Highlight the chosen segment's bytes in the hex view
    pub fn show_selected_segment(&mut self) {
        if let Some(id) = self.selected_segment()
            && let Err(err) = self.doc.select_segment(id, &mut self.view)
        {
            self.status = err.to_string();
        }
        self.drain_events();
    }

    pub fn split_selection(&mut self) {
        let patch = self.doc.split_selection(&self.view);
        self.after_edit(patch);
    }

    pub fn create_child_from_selection(&mut self) {
        let patch = self.doc.create_child_from_selection(&self.view);
        self.after_edit(patch);
    }

    /// Run a command against the segment chosen in the list
    pub fn apply_to_selected(&mut self, build: impl FnOnce(SegmentId) -> Cmd) {
        if let Some(id) = self.selected_segment() {
            let patch = self.doc.apply(build(id));
            self.after_edit(patch);
        }
    }

    pub fn begin_define_struct(&mut self) {
        let Some(id) = self.selected_segment() else {
            return;
        };
        match self.doc.begin_define_struct(id) {
            Ok(request) => self.open_prompt(Prompt::StructName(request)),
            Err(err) => self.status = err.to_string(),
        }
    }

    pub fn open_prompt_for_selected(&mut self, build: impl FnOnce(SegmentId) -> Prompt) {
        if let Some(id) = self.selected_segment() {
            self.open_prompt(build(id));
        }
    }

    /// Labels the segment can be displayed as, for the format prompt
    pub fn format_choices(&self, target: SegmentId) -> Vec<String> {
        self.doc
            .applicable_formats(target)
            .map(|formats| formats.iter().map(|f| f.label().to_string()).collect())
            .unwrap_or_default()
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some((prompt, String::new()));
    }

    /// Dropping the prompt also cancels a pending struct definition
    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn submit_prompt(&mut self) {
        let Some((prompt, input)) = self.prompt.take() else {
            return;
        };
        let input = input.trim();
        let patch = match prompt {
            Prompt::Rename(target) => self.doc.apply(Cmd::Rename {
                target,
                name: input.to_string(),
            }),
            Prompt::StructName(request) => request.submit(&mut self.doc, input),
            Prompt::ApplyStruct(target) => self.doc.apply(Cmd::ApplyStruct {
                label: input.to_string(),
                target,
            }),
            Prompt::DisplayFormat(target) => self.doc.apply(Cmd::SetDisplayFormat {
                target,
                format: input.to_string(),
            }),
            Prompt::Chunk { target, mode } => match self.chunk_command(target, mode, input) {
                Ok(cmd) => self.doc.apply(cmd),
                Err(message) => {
                    self.status = message;
                    return;
                }
            },
        };
        self.after_edit(patch);
    }

    /// Parse `<format> [chunk bytes]`; the chunk defaults to the format's size
    fn chunk_command(&self, target: SegmentId, mode: ChunkMode, input: &str) -> Result<Cmd, String> {
        let mut words = input.split_whitespace();
        let format = words
            .next()
            .ok_or_else(|| "no format given".to_string())?
            .to_string();
        let chunk_len = match words.next() {
            Some(word) => word
                .parse::<u64>()
                .map_err(|_| format!("'{word}' is not a byte count"))?,
            None => self
                .doc
                .catalog()
                .get(&format)
                .map(|descriptor| descriptor.min_bytes())
                .ok_or_else(|| format!("unknown format '{format}'"))?,
        };
        Ok(match mode {
            ChunkMode::Split => Cmd::SplitByFormat {
                target,
                format,
                chunk_len,
            },
            ChunkMode::Array => Cmd::SetArrayByFormat {
                target,
                format,
                chunk_len,
            },
            ChunkMode::Separate => Cmd::SeparateByFormat {
                target,
                format,
                chunk_len,
            },
        })
    }

    pub fn write_layout(&mut self) {
        let result = File::create(&self.layout_path)
            .map_err(anyhow::Error::from)
            .and_then(|file| Ok(self.doc.write_layout(file)?));
        self.status = match result {
            Ok(()) => format!("layout written to {}", self.layout_path.display()),
            Err(err) => format!("could not write layout: {err}"),
        };
    }

    fn after_edit(&mut self, patch: Option<Patch>) {
        self.refresh();
        if let Some(patch) = patch {
            self.status.clear();
            if let Some(selected) = patch.new_selection
                && let Some(index) = self.snapshot.segments.iter().position(|s| s.id == selected)
            {
                self.list_state.select(Some(index));
                self.show_selected_segment();
            }
            if !patch.synced.is_empty() {
                self.status = format!("updated {} other instance(s)", patch.synced.len());
            }
        }
        self.drain_events();
    }

    fn refresh(&mut self) {
        let previous = self.selected_segment();
        self.snapshot = self.doc.snapshot();
        let index = previous
            .and_then(|id| self.snapshot.segments.iter().position(|s| s.id == id))
            .or_else(|| {
                self.list_state
                    .selected()
                    .map(|i| i.min(self.snapshot.segments.len().saturating_sub(1)))
            });
        self.list_state.select(index);
    }

    /// Warnings go to the status line; everything else is already reflected
    fn drain_events(&mut self) {
        for event in self.doc.take_events() {
            match event {
                EditorEvent::ShowWarningMessage { message } => self.status = message,
                EditorEvent::TreeReplaced => self.refresh(),
                other => log::debug!("event {other:?}"),
            }
        }
    }
}
