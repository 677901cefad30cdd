use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, Mention, Timestamp, UserId};

use crate::config::{UiConfig, UiMode, MAX_SELECT_OPTIONS};
use crate::pagination::{page_window, NavAction, Page};

/// Select menus carry their action in the chosen option's value, so their own ids only route.
pub(crate) const CHARACTER_MENU_ID: &str = "character_select";
pub(crate) const PAGE_MENU_ID: &str = "character_page";

pub(crate) const EMPTY_LIST_MESSAGE: &str = "❌ The character list is empty. Please ask an admin to add some characters.";
pub(crate) const STALE_WIDGET_MESSAGE: &str = "⌛ This menu is no longer valid, run `/character select` again.";

const MAX_CUSTOM_ID_LEN: usize = 100;
const MAX_OPTION_LABEL_LEN: usize = 100;
const MAX_BUTTON_LABEL_LEN: usize = 80;
const BUTTONS_PER_ROW: usize = 5;

const SELECT_COLOUR: u32 = 0x0099FF;
const SELECTED_COLOUR: u32 = 0x00FF00;

/// Embed plus component rows for one page of the character list.
pub(crate) fn render_page(page: &Page<String>, character_count: usize, ui: &UiConfig) -> (CreateEmbed, Vec<CreateActionRow>) {
    let embed = page_embed(page, character_count, ui.mode);

    let mut rows: Vec<CreateActionRow> = match ui.mode {
        UiMode::Menu | UiMode::PageSelect => character_menu(page).map(CreateActionRow::SelectMenu).into_iter().collect(),
        UiMode::Buttons => character_button_rows(page),
    };

    if page.total_pages > 1 {
        match ui.mode {
            UiMode::Menu => rows.push(CreateActionRow::Buttons(nav_buttons(page, None))),
            UiMode::PageSelect => rows.push(CreateActionRow::SelectMenu(page_menu(page))),
            UiMode::Buttons => rows.push(CreateActionRow::Buttons(nav_buttons(page, Some(ui.effective_window_size())))),
        }
    }

    (embed, rows)
}

fn page_embed(page: &Page<String>, character_count: usize, mode: UiMode) -> CreateEmbed {
    let description = match mode {
        UiMode::Menu | UiMode::PageSelect => "Choose your character from the drop-down menu below.",
        UiMode::Buttons => "Choose your character with the buttons below.",
    };

    CreateEmbed::new()
        .colour(SELECT_COLOUR)
        .title("🎮 Character select")
        .description(description)
        .footer(CreateEmbedFooter::new(format!("Page {}/{} · {} characters available", page.page_index + 1, page.total_pages, character_count)))
}

pub(crate) fn selection_embed(user_id: UserId, name: &str) -> CreateEmbed {
    CreateEmbed::new()
        .colour(SELECTED_COLOUR)
        .title("✅ Character selected")
        .description(format!("{} selected **{}**", Mention::from(user_id), name))
        .timestamp(Timestamp::now())
}

/// Actions whose encoded id Discord would reject are left out of the message.
fn encodable(action: &NavAction) -> Option<String> {
    let id = action.encode();
    if id.chars().count() > MAX_CUSTOM_ID_LEN {
        tracing::warn!("Skipping widget with an identifier longer than {} characters: {}", MAX_CUSTOM_ID_LEN, id);
        return None;
    }
    Some(id)
}

fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        return label.to_string();
    }
    let mut truncated: String = label.chars().take(max_len - 1).collect();
    truncated.push('…');
    truncated
}

/// `None` when no name on the page can be encoded, Discord rejects empty menus.
fn character_menu(page: &Page<String>) -> Option<CreateSelectMenu> {
    let options: Vec<CreateSelectMenuOption> = page
        .items
        .iter()
        .filter_map(|name| {
            let value = encodable(&NavAction::SelectCharacter { name: name.clone() })?;
            Some(CreateSelectMenuOption::new(truncate_label(name, MAX_OPTION_LABEL_LEN), value))
        })
        .collect();
    if options.is_empty() {
        return None;
    }

    Some(CreateSelectMenu::new(CHARACTER_MENU_ID, CreateSelectMenuKind::String { options }).placeholder("Select a character"))
}

fn page_menu(page: &Page<String>) -> CreateSelectMenu {
    let mut options = vec![];
    if let Some((start, end)) = page_window(page.page_index, page.total_pages, MAX_SELECT_OPTIONS) {
        for page_index in start..=end {
            let value = NavAction::GoToPage { page_index }.encode();
            let option = CreateSelectMenuOption::new(format!("Page {}/{}", page_index + 1, page.total_pages), value).default_selection(page_index == page.page_index);
            options.push(option);
        }
    }

    CreateSelectMenu::new(PAGE_MENU_ID, CreateSelectMenuKind::String { options }).placeholder(format!("Page {}/{}", page.page_index + 1, page.total_pages))
}

fn character_button_rows(page: &Page<String>) -> Vec<CreateActionRow> {
    let buttons: Vec<CreateButton> = page
        .items
        .iter()
        .filter_map(|name| {
            let custom_id = encodable(&NavAction::SelectCharacter { name: name.clone() })?;
            Some(CreateButton::new(custom_id).label(truncate_label(name, MAX_BUTTON_LABEL_LEN)).style(ButtonStyle::Secondary))
        })
        .collect();

    buttons.chunks(BUTTONS_PER_ROW).map(|chunk| CreateActionRow::Buttons(chunk.to_vec())).collect()
}

/// Prev and next around the current page, with numbered shortcuts when a window is given.
fn nav_buttons(page: &Page<String>, window_size: Option<usize>) -> Vec<CreateButton> {
    let from_page_index = page.page_index;
    let mut buttons = vec![CreateButton::new(NavAction::PrevPage { from_page_index }.encode()).label("◀ Prev").style(ButtonStyle::Primary).disabled(!page.has_prev)];

    match window_size.and_then(|size| page_window(page.page_index, page.total_pages, size)) {
        Some((start, end)) => {
            for page_index in start..=end {
                let is_current = page_index == page.page_index;
                let style = if is_current { ButtonStyle::Success } else { ButtonStyle::Secondary };
                buttons.push(CreateButton::new(NavAction::GoToPage { page_index }.encode()).label((page_index + 1).to_string()).style(style).disabled(is_current));
            }
        }
        None => {
            // Page indicator only, it carries no action of its own.
            buttons.push(
                CreateButton::new(NavAction::GoToPage { page_index: page.page_index }.encode())
                    .label(format!("{}/{}", page.page_index + 1, page.total_pages))
                    .style(ButtonStyle::Secondary)
                    .disabled(true),
            );
        }
    }

    buttons.push(CreateButton::new(NavAction::NextPage { from_page_index }.encode()).label("Next ▶").style(ButtonStyle::Primary).disabled(!page.has_next));
    buttons
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::pagination::paginate;

    fn ui(mode: UiMode, page_size: usize) -> UiConfig {
        UiConfig { mode, page_size, window_size: 3 }
    }

    fn roster(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Fighter {i}")).collect()
    }

    /// Component JSON as Discord would receive it.
    fn rows_json(rows: &[CreateActionRow]) -> Vec<Value> {
        rows.iter().map(|row| serde_json::to_value(row).unwrap()).collect()
    }

    fn custom_ids(row: &Value) -> Vec<String> {
        row["components"].as_array().unwrap().iter().map(|component| component["custom_id"].as_str().unwrap().to_string()).collect()
    }

    fn option_values(row: &Value) -> Vec<String> {
        row["components"][0]["options"].as_array().unwrap().iter().map(|option| option["value"].as_str().unwrap().to_string()).collect()
    }

    #[test]
    fn single_page_menu_has_no_navigation() {
        let names = roster(3);
        let page = paginate(&names, 25, 0).unwrap();
        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::Menu, 25));

        let rows = rows_json(&rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["components"][0]["custom_id"], CHARACTER_MENU_ID);
        assert_eq!(option_values(&rows[0]), vec!["char:Fighter 0", "char:Fighter 1", "char:Fighter 2"]);
    }

    #[test]
    fn menu_mode_adds_prev_and_next() {
        let names = roster(7);
        let page = paginate(&names, 3, 1).unwrap();
        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::Menu, 3));

        let rows = rows_json(&rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(option_values(&rows[0]), vec!["char:Fighter 3", "char:Fighter 4", "char:Fighter 5"]);
        assert_eq!(custom_ids(&rows[1]), vec!["prev:1", "page:1", "next:1"]);
    }

    #[test]
    fn page_select_mode_lists_pages() {
        let names = roster(7);
        let page = paginate(&names, 2, 0).unwrap();
        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::PageSelect, 2));

        let rows = rows_json(&rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["components"][0]["custom_id"], PAGE_MENU_ID);
        assert_eq!(option_values(&rows[1]), vec!["page:0", "page:1", "page:2", "page:3"]);
    }

    #[test]
    fn button_mode_uses_rows_of_five_and_a_page_window() {
        let names = roster(60);
        let page = paginate(&names, 20, 2).unwrap();
        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::Buttons, 20));

        let rows = rows_json(&rows);
        assert_eq!(rows.len(), 5);
        for row in &rows[..4] {
            assert_eq!(row["components"].as_array().unwrap().len(), 5);
        }
        assert_eq!(custom_ids(&rows[0])[0], "char:Fighter 40");
        assert_eq!(custom_ids(&rows[4]), vec!["prev:2", "page:0", "page:1", "page:2", "next:2"]);
        assert_eq!(rows[4]["components"][4]["disabled"], true);
    }

    #[test]
    fn overlong_names_are_left_out() {
        let names = vec!["Ryu".to_string(), "x".repeat(120)];
        let page = paginate(&names, 25, 0).unwrap();
        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::Menu, 25));

        assert_eq!(option_values(&rows_json(&rows)[0]), vec!["char:Ryu"]);
    }

    #[test]
    fn page_of_only_overlong_names_has_no_empty_menu() {
        let names = vec!["x".repeat(120), "y".repeat(120), "Ryu".to_string()];
        let page = paginate(&names, 2, 0).unwrap();
        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::Menu, 2));

        let rows = rows_json(&rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(custom_ids(&rows[0]), vec!["prev:0", "page:0", "next:0"]);

        let (_, rows) = render_page(&page, names.len(), &ui(UiMode::Buttons, 2));
        assert_eq!(custom_ids(&rows_json(&rows)[0]), vec!["prev:0", "page:0", "page:1", "next:0"]);
    }

    #[test]
    fn labels_are_truncated() {
        assert_eq!(truncate_label("Ken", 80), "Ken");
        let long = truncate_label(&"あ".repeat(90), 80);
        assert_eq!(long.chars().count(), 80);
        assert!(long.ends_with('…'));
    }
}
