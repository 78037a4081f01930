use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    DefaultTerminal, Frame,
};

use crate::api::Backend;
use crate::columns::{ColumnDescriptor, ColumnType};
use crate::editor::{CellEditor, CellInput};
use crate::filter::{unique_display_values, unique_months, GridFilters};
use crate::fmt::display_value;
use crate::grid::{Grid, Notice, PendingAction};
use crate::models::{Transaction, TransactionType};
use crate::tui::{
    self, severity_color, FOOTER_STYLE, HEADER_STYLE, SELECTED_CELL_STYLE, SELECTED_STYLE,
};

enum SheetMode {
    Normal,
    /// Live search; every keystroke refilters.
    Search,
    EditCell {
        buffer: String,
    },
    /// Checklist over the selected column's distinct displayed values.
    ColumnFilter {
        col_idx: usize,
        values: Vec<String>,
        checked: Vec<bool>,
        cursor: usize,
    },
    Confirm {
        message: String,
    },
}

pub enum SheetAction {
    Continue,
    Close,
    /// The user accepted the pending confirmation.
    ExecuteConfirm,
    /// Save one row inline (store index).
    SaveRow(usize),
    Refresh,
}

/// Interactive spreadsheet over the transaction grid. Pure key handling lives
/// here; all backend effects are returned as [`SheetAction`]s and executed by
/// the event loop.
pub struct SheetView {
    pub grid: Grid,
    pub filters: GridFilters,
    editor: CellEditor,
    mode: SheetMode,
    /// Store indices of the rows that pass the filters, in store order.
    visible: Vec<usize>,
    /// Cursor position within `visible`.
    selected: usize,
    sel_col: usize,
    offset: usize,
    col_offset: usize,
    visible_count: usize,
    status: Option<Notice>,
    table_state: TableState,
}

impl SheetView {
    pub fn new(grid: Grid) -> Self {
        let mut view = SheetView {
            grid,
            filters: GridFilters::default(),
            editor: CellEditor::default(),
            mode: SheetMode::Normal,
            visible: Vec::new(),
            selected: 0,
            sel_col: 0,
            offset: 0,
            col_offset: 0,
            visible_count: 1,
            status: None,
            table_state: TableState::default(),
        };
        view.recompute();
        view
    }

    /// Recompute the visible subset and clamp the cursor into it.
    fn recompute(&mut self) {
        self.visible = self.grid.visible(&self.filters);
        if self.visible.is_empty() {
            self.selected = 0;
            self.offset = 0;
        } else {
            self.selected = self.selected.min(self.visible.len() - 1);
            self.offset = self.offset.min(self.selected);
        }
    }

    /// Store index of the row under the cursor.
    fn selected_row(&self) -> Option<usize> {
        self.visible.get(self.selected).copied()
    }

    pub fn run(&mut self, backend: &mut dyn Backend) -> io::Result<()> {
        let hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            ratatui::restore();
            hook(info);
        }));

        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal, backend);
        ratatui::restore();
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut DefaultTerminal,
        backend: &mut dyn Backend,
    ) -> io::Result<()> {
        loop {
            terminal.draw(|frame| self.draw_frame(frame))?;

            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
            {
                if kind != KeyEventKind::Press {
                    continue;
                }
                if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                    break;
                }
                match self.handle_key_event(code) {
                    SheetAction::Close => break,
                    SheetAction::Continue => {}
                    SheetAction::ExecuteConfirm => {
                        let notices = self.grid.confirm(backend);
                        self.status = notices.into_iter().last();
                        self.recompute();
                    }
                    SheetAction::SaveRow(idx) => {
                        self.status = Some(self.grid.save_row_inline(idx, backend));
                        self.recompute();
                    }
                    SheetAction::Refresh => {
                        self.status = match self.grid.refresh(backend) {
                            Ok(()) => Some(Notice::info("Transações recarregadas.")),
                            Err(e) => {
                                Some(Notice::error(format!("Erro ao recarregar transações: {e}")))
                            }
                        };
                        self.recompute();
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle a key press. Returns what the event loop should do next.
    pub fn handle_key_event(&mut self, code: KeyCode) -> SheetAction {
        match &self.mode {
            SheetMode::Normal => return self.handle_normal_key(code),
            SheetMode::Search => self.handle_search_key(code),
            SheetMode::EditCell { .. } => self.handle_edit_key(code),
            SheetMode::ColumnFilter { .. } => self.handle_column_filter_key(code),
            SheetMode::Confirm { .. } => return self.handle_confirm_key(code),
        }
        SheetAction::Continue
    }

    fn handle_normal_key(&mut self, code: KeyCode) -> SheetAction {
        self.status = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return SheetAction::Close,
            KeyCode::Down => {
                if self.selected + 1 < self.visible.len() {
                    self.selected += 1;
                    if self.selected >= self.offset + self.visible_count {
                        self.offset += 1;
                    }
                }
            }
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    if self.selected < self.offset {
                        self.offset = self.selected;
                    }
                }
            }
            KeyCode::PageDown => {
                let last = self.visible.len().saturating_sub(1);
                self.selected = (self.selected + self.visible_count).min(last);
                self.offset = (self.offset + self.visible_count).min(self.selected);
            }
            KeyCode::PageUp => {
                self.selected = self.selected.saturating_sub(self.visible_count);
                self.offset = self.offset.min(self.selected);
            }
            KeyCode::Home => {
                self.selected = 0;
                self.offset = 0;
            }
            KeyCode::End => {
                self.selected = self.visible.len().saturating_sub(1);
                self.offset = self.visible.len().saturating_sub(self.visible_count);
            }
            KeyCode::Right => {
                if self.sel_col + 1 < self.grid.columns.len() {
                    self.sel_col += 1;
                }
            }
            KeyCode::Left => {
                self.sel_col = self.sel_col.saturating_sub(1);
            }
            KeyCode::Char('/') => self.mode = SheetMode::Search,
            KeyCode::Char('t') => {
                self.filters.tipo = match self.filters.tipo {
                    None => Some(TransactionType::Income),
                    Some(TransactionType::Income) => Some(TransactionType::Expense),
                    Some(TransactionType::Expense) => None,
                };
                self.recompute();
            }
            KeyCode::Char('m') => {
                self.cycle_month();
                self.recompute();
            }
            KeyCode::Char('f') => self.open_column_filter(),
            KeyCode::Char('a') => match self.grid.request(PendingAction::AddRow) {
                Ok(message) => self.mode = SheetMode::Confirm { message },
                Err(notice) => self.status = Some(notice),
            },
            KeyCode::Char('d') => {
                if let Some(idx) = self.selected_row() {
                    let id = self.grid.rows[idx].id.clone();
                    match self.grid.request(PendingAction::DeleteRow(id)) {
                        Ok(message) => self.mode = SheetMode::Confirm { message },
                        Err(notice) => self.status = Some(notice),
                    }
                }
            }
            KeyCode::Char('s') => match self.grid.request(PendingAction::SaveAll) {
                Ok(message) => self.mode = SheetMode::Confirm { message },
                Err(notice) => self.status = Some(notice),
            },
            KeyCode::Char('w') => {
                if let Some(idx) = self.selected_row() {
                    return SheetAction::SaveRow(idx);
                }
            }
            KeyCode::Char('r') => return SheetAction::Refresh,
            KeyCode::Char('e') | KeyCode::Enter => self.begin_cell_edit(),
            _ => {}
        }
        SheetAction::Continue
    }

    /// Enter the mode appropriate for the selected column: toggle booleans in
    /// place, cycle select options, open a text buffer for everything else.
    fn begin_cell_edit(&mut self) {
        let Some(row_idx) = self.selected_row() else {
            return;
        };
        let col = self.grid.columns[self.sel_col].clone();
        match col.kind {
            ColumnType::Boolean => {
                let next = !self.grid.rows[row_idx].parcelado;
                self.commit_cell(row_idx, &col, CellInput::Toggle(next));
            }
            ColumnType::Select => {
                if let Some(next) = next_option(&self.grid.rows[row_idx], &col) {
                    self.commit_cell(row_idx, &col, CellInput::Text(next));
                }
            }
            _ => {
                let buffer = raw_value(&self.grid.rows[row_idx], &col);
                self.editor.begin_edit(row_idx, col.id);
                self.mode = SheetMode::EditCell { buffer };
            }
        }
    }

    fn commit_cell(&mut self, row_idx: usize, col: &ColumnDescriptor, input: CellInput) {
        if let Err(e) = self.editor.commit(&mut self.grid.rows, row_idx, col, input) {
            self.status = Some(Notice::error(format!("{e}")));
        }
        self.recompute();
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter | KeyCode::Esc => self.mode = SheetMode::Normal,
            KeyCode::Backspace => {
                self.filters.search.pop();
                self.recompute();
            }
            KeyCode::Char(c) => {
                self.filters.search.push(c);
                self.recompute();
            }
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editor.end_edit();
                self.mode = SheetMode::Normal;
            }
            KeyCode::Backspace => {
                if let SheetMode::EditCell { buffer } = &mut self.mode {
                    buffer.pop();
                }
            }
            KeyCode::Char(c) => {
                if let SheetMode::EditCell { buffer } = &mut self.mode {
                    buffer.push(c);
                }
            }
            KeyCode::Enter => {
                let buffer = match std::mem::replace(&mut self.mode, SheetMode::Normal) {
                    SheetMode::EditCell { buffer } => buffer,
                    _ => return,
                };
                if let Some((row_idx, col_id)) = self.editor.editing() {
                    let col_id = col_id.to_string();
                    if let Some(col) = self
                        .grid
                        .columns
                        .iter()
                        .find(|c| c.id == col_id)
                        .cloned()
                    {
                        self.commit_cell(row_idx, &col, CellInput::Text(buffer));
                    }
                }
                self.editor.end_edit();
            }
            _ => {}
        }
    }

    fn open_column_filter(&mut self) {
        let col = &self.grid.columns[self.sel_col];
        let values = unique_display_values(&self.grid.rows, col);
        let checked: Vec<bool> = match self.filters.columns.get(col.id) {
            Some(allowed) => values.iter().map(|v| allowed.contains(v)).collect(),
            None => vec![true; values.len()],
        };
        self.mode = SheetMode::ColumnFilter {
            col_idx: self.sel_col,
            values,
            checked,
            cursor: 0,
        };
    }

    fn handle_column_filter_key(&mut self, code: KeyCode) {
        let SheetMode::ColumnFilter {
            col_idx,
            values,
            checked,
            cursor,
        } = &mut self.mode
        else {
            return;
        };
        match code {
            KeyCode::Up => *cursor = cursor.saturating_sub(1),
            KeyCode::Down => {
                if *cursor + 1 < values.len() {
                    *cursor += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(c) = checked.get_mut(*cursor) {
                    *c = !*c;
                }
            }
            KeyCode::Char('a') => checked.iter_mut().for_each(|c| *c = true),
            KeyCode::Char('n') => checked.iter_mut().for_each(|c| *c = false),
            KeyCode::Enter => {
                let col_id = self.grid.columns[*col_idx].id.to_string();
                if checked.iter().all(|c| *c) {
                    // Everything allowed is the same as no filter.
                    self.filters.columns.remove(&col_id);
                } else {
                    let allowed: Vec<String> = values
                        .iter()
                        .zip(checked.iter())
                        .filter(|(_, c)| **c)
                        .map(|(v, _)| v.clone())
                        .collect();
                    self.filters.columns.insert(col_id, allowed);
                }
                self.mode = SheetMode::Normal;
                self.recompute();
            }
            KeyCode::Esc => self.mode = SheetMode::Normal,
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode) -> SheetAction {
        match code {
            KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => {
                self.mode = SheetMode::Normal;
                SheetAction::ExecuteConfirm
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.grid.cancel();
                self.mode = SheetMode::Normal;
                SheetAction::Continue
            }
            _ => SheetAction::Continue,
        }
    }

    fn cycle_month(&mut self) {
        let months = unique_months(&self.grid.rows);
        self.filters.month = match &self.filters.month {
            None => months.first().cloned(),
            Some(current) => {
                let pos = months.iter().position(|m| m == current);
                match pos {
                    Some(i) if i + 1 < months.len() => Some(months[i + 1].clone()),
                    _ => None,
                }
            }
        };
    }

    fn filters_desc(&self) -> String {
        let mut parts = Vec::new();
        if !self.filters.search.is_empty() {
            parts.push(format!("busca: {}", self.filters.search));
        }
        if let Some(tipo) = self.filters.tipo {
            parts.push(format!("tipo: {}", tipo.label()));
        }
        if let Some(ref month) = self.filters.month {
            parts.push(format!("mês: {month}"));
        }
        if !self.filters.columns.is_empty() {
            parts.push(format!("{} coluna(s) filtrada(s)", self.filters.columns.len()));
        }
        parts.join(" | ")
    }

    /// Draw the sheet into the given frame.
    pub fn draw_frame(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let panel_height: u16 = match &self.mode {
            SheetMode::ColumnFilter { values, .. } => 1 + values.len().min(12) as u16,
            SheetMode::Confirm { .. } => 1,
            _ => 0,
        };

        let areas = Layout::vertical([
            Constraint::Length(1),             // title
            Constraint::Fill(1),               // table
            Constraint::Length(panel_height),  // filter checklist / confirm
            Constraint::Length(1),             // status
            Constraint::Length(1),             // keys
        ])
        .split(area);
        let title_area = areas[0];
        let table_area = areas[1];
        let panel_area = areas[2];
        let status_area = areas[3];
        let keys_area = areas[4];

        frame.render_widget(
            Paragraph::new("Planilha de Transações").style(HEADER_STYLE),
            title_area,
        );

        // Horizontal window of columns: keep the selected column on screen.
        if self.sel_col < self.col_offset {
            self.col_offset = self.sel_col;
        }
        let marker_width = 2u16;
        loop {
            let mut used = marker_width;
            let mut fit = 0usize;
            for col in self.grid.columns.iter().skip(self.col_offset) {
                let w = column_width(col) + 1;
                if used + w > table_area.width {
                    break;
                }
                used += w;
                fit += 1;
            }
            if self.sel_col < self.col_offset + fit.max(1) {
                break;
            }
            self.col_offset += 1;
        }
        let shown: Vec<&ColumnDescriptor> = {
            let mut used = marker_width;
            self.grid
                .columns
                .iter()
                .skip(self.col_offset)
                .take_while(|col| {
                    let w = column_width(col) + 1;
                    if used + w > table_area.width {
                        false
                    } else {
                        used += w;
                        true
                    }
                })
                .collect()
        };

        let available_height = table_area.height.saturating_sub(2) as usize;
        self.visible_count = available_height.max(1);

        let editing = self.editor.editing();
        let mut rendered_rows = Vec::new();
        for (vis_idx, &store_idx) in self
            .visible
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.visible_count)
        {
            let row = &self.grid.rows[store_idx];
            let marker = if row.is_new {
                "+"
            } else if row.is_modified {
                "*"
            } else {
                ""
            };
            let mut cells = vec![Cell::from(marker)];
            for (c, col) in shown.iter().enumerate() {
                let is_cursor =
                    vis_idx == self.selected && self.col_offset + c == self.sel_col;
                let cell = if is_cursor && editing.map(|(r, _)| r) == Some(store_idx) {
                    let buffer = match &self.mode {
                        SheetMode::EditCell { buffer } => buffer.as_str(),
                        _ => "",
                    };
                    Cell::from(format!("{buffer}\u{2588}")).style(SELECTED_CELL_STYLE)
                } else if col.id == "valor" && !is_cursor {
                    Cell::from(tui::money_span(&row.valor, row.tipo))
                } else {
                    let (text, _) = tui::wrap_text(
                        &display_value(row, col),
                        column_width(col) as usize,
                    );
                    let style = if is_cursor {
                        SELECTED_CELL_STYLE
                    } else {
                        Style::default()
                    };
                    Cell::from(text).style(style)
                };
                cells.push(cell);
            }
            rendered_rows.push(Row::new(cells));
        }

        let mut widths = vec![Constraint::Length(marker_width)];
        widths.extend(shown.iter().map(|c| Constraint::Length(column_width(c))));
        let mut header_cells = vec![Cell::from("")];
        header_cells.extend(shown.iter().map(|c| {
            let marked = self.filters.columns.contains_key(c.id);
            let name = if marked {
                format!("{} ▾", c.name)
            } else {
                c.name.to_string()
            };
            Cell::from(name)
        }));

        self.table_state
            .select(Some(self.selected.saturating_sub(self.offset)));
        let table = Table::new(rendered_rows, widths)
            .header(Row::new(header_cells).style(HEADER_STYLE).bottom_margin(1))
            .column_spacing(1)
            .row_highlight_style(SELECTED_STYLE);
        frame.render_stateful_widget(table, table_area, &mut self.table_state);

        if panel_height > 0 {
            let lines: Vec<Line> = match &self.mode {
                SheetMode::ColumnFilter {
                    col_idx,
                    values,
                    checked,
                    cursor,
                } => {
                    let mut lines = vec![Line::from(Span::styled(
                        format!("  Filtrar coluna: {}", self.grid.columns[*col_idx].name),
                        HEADER_STYLE,
                    ))];
                    for (i, (value, on)) in values.iter().zip(checked).enumerate().take(12) {
                        let mark = if *on { "[x]" } else { "[ ]" };
                        let pointer = if i == *cursor { ">" } else { " " };
                        lines.push(Line::from(format!("  {pointer} {mark} {value}")));
                    }
                    lines
                }
                SheetMode::Confirm { message } => {
                    vec![Line::from(Span::styled(
                        format!("  {message}"),
                        Style::default().fg(ratatui::style::Color::Yellow),
                    ))]
                }
                _ => vec![],
            };
            frame.render_widget(Paragraph::new(lines), panel_area);
        }

        let end_row = (self.offset + self.visible_count).min(self.visible.len());
        let filters = self.filters_desc();
        let mut status = format!(
            "Linhas {}-{} de {} ({} no total)",
            if self.visible.is_empty() { 0 } else { self.offset + 1 },
            end_row,
            self.visible.len(),
            self.grid.rows.len(),
        );
        if !filters.is_empty() {
            status.push_str(&format!(" | {filters}"));
        }
        let status_widget = if let Some(ref notice) = self.status {
            Paragraph::new(format!("{status} | {}", notice.message))
                .style(Style::default().fg(severity_color(notice.severity)))
        } else {
            Paragraph::new(status).style(FOOTER_STYLE)
        };
        frame.render_widget(status_widget, status_area);

        let keys = match &self.mode {
            SheetMode::Normal => Paragraph::new(
                "\u{2191}\u{2193}\u{2190}\u{2192}:célula  e:editar  a:adicionar  d:excluir  s:salvar tudo  w:salvar linha  /:buscar  t:tipo  m:mês  f:filtro coluna  r:recarregar  q:sair",
            )
            .style(FOOTER_STYLE),
            SheetMode::Search => {
                Paragraph::new(format!("Buscar: {}\u{2588}", self.filters.search))
            }
            SheetMode::EditCell { buffer } => {
                Paragraph::new(format!("Editar célula: {buffer}\u{2588}  (Enter=confirmar, Esc=cancelar)"))
            }
            SheetMode::ColumnFilter { .. } => Paragraph::new(
                "espaço:marcar  a:todos  n:nenhum  Enter=aplicar  Esc=cancelar",
            )
            .style(FOOTER_STYLE),
            SheetMode::Confirm { .. } => {
                Paragraph::new("s/Enter=confirmar  n/Esc=cancelar").style(FOOTER_STYLE)
            }
        };
        frame.render_widget(keys, keys_area);
    }
}

fn column_width(col: &ColumnDescriptor) -> u16 {
    match col.id {
        "descricao" => 24,
        "valor" => 14,
        "conta_id" | "categoria_id" => 16,
        "observacoes" => 18,
        "entidade" => 14,
        "data" | "data_vencimento" | "data_pagamento_recebimento" => 12,
        "tipo" | "parcelado" | "status" => 10,
        _ => 8,
    }
}

/// Raw (unformatted) value of a cell, used to seed the edit buffer.
fn raw_value(row: &Transaction, col: &ColumnDescriptor) -> String {
    match col.id {
        "descricao" => row.descricao.clone(),
        "valor" => row.valor.clone(),
        "data" => row.data.clone().unwrap_or_default(),
        "observacoes" => row.observacoes.clone(),
        "data_vencimento" => row.data_vencimento.clone().unwrap_or_default(),
        "entidade" => row.entidade.clone(),
        "data_pagamento_recebimento" => {
            row.data_pagamento_recebimento.clone().unwrap_or_default()
        }
        "numero_parcela" => row.numero_parcela.map(|v| v.to_string()).unwrap_or_default(),
        "total_parcelas" => row.total_parcelas.map(|v| v.to_string()).unwrap_or_default(),
        "id_transacao_pai" => row.id_transacao_pai.map(|v| v.to_string()).unwrap_or_default(),
        "status" => row.status.clone(),
        _ => String::new(),
    }
}

/// Next option of a select column, cycling past the current value.
fn next_option(row: &Transaction, col: &ColumnDescriptor) -> Option<String> {
    if col.options.is_empty() {
        return None;
    }
    let current = match col.id {
        "tipo" => row.tipo.as_str().to_string(),
        "conta_id" => row.conta_id.map(|v| v.to_string()).unwrap_or_default(),
        "categoria_id" => row.categoria_id.map(|v| v.to_string()).unwrap_or_default(),
        _ => String::new(),
    };
    let pos = col.options.iter().position(|o| o.value == current);
    let next = match pos {
        Some(i) => (i + 1) % col.options.len(),
        None => 0,
    };
    Some(col.options[next].value.clone())
}
