// Shell state - the program browser
//
// Lists the storage root, directories first, and lets the user walk the
// tree and launch programs. When storage disappears mid-session the shell
// shows an error and re-probes the backend on the next entry.

use crate::assets;
use crate::drivers::StorageEntry;
use crate::gpu::{Rect, COLOR_NONE, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::graphics::{anchor, BitmapFont};
use crate::input::buttons;
use crate::kernel::{Kernel, RuntimeState};

/// Upper bound on directory entries the shell keeps.
const MAX_DIRECTORY_ENTRIES: usize = 256;

/// The shell's browsing state.
pub(crate) struct ShellContext {
    entries: Vec<StorageEntry>,
    directory_path: String,
    entry_path: String,
    selected_entry: usize,
    first_entry: i32,
    last_entry: i32,
    bar_color: u8,
    selection_color: u8,
    disabled_color: u8,
    bar_height: i32,
    reload_storage: bool,
    one_game_check: bool,
}

impl ShellContext {
    pub(crate) fn new() -> Self {
        ShellContext {
            entries: Vec::new(),
            directory_path: String::new(),
            entry_path: String::new(),
            selected_entry: 0,
            first_entry: -1,
            last_entry: -1,
            bar_color: 0,
            selection_color: 0,
            disabled_color: 0,
            bar_height: 0,
            reload_storage: false,
            one_game_check: false,
        }
    }
}

/// Resolve colors and layout once the GPU palette exists.
pub(crate) fn initialize(kernel: &mut Kernel) {
    let font = BitmapFont::default_font();

    kernel.shell.bar_height = font.char_height as i32 + 1;
    kernel.shell.bar_color = kernel.graphics.nearest_color_index(64, 64, 64);
    kernel.shell.selection_color = kernel.graphics.nearest_color_index(80, 160, 200);
    kernel.shell.disabled_color = kernel.graphics.nearest_color_index(64, 64, 64);

    reset_entries(kernel);
    kernel.shell.one_game_check = true;
}

pub(crate) fn shell_update(kernel: &mut Kernel) {
    if kernel.shell.reload_storage {
        kernel.shell.reload_storage = false;
        kernel.refresh_storage();
        reset_entries(kernel);
        kernel.shell.one_game_check = true;
        return;
    }

    // A card with exactly one program on it boots straight into it.
    if kernel.shell.one_game_check {
        kernel.shell.one_game_check = false;

        if kernel.shell.entries.len() == 1 && kernel.shell.entries[0].is_program {
            load_game(kernel);
            return;
        }
    }

    handle_input(kernel);

    kernel.graphics.clear_screen(0);
    kernel.graphics.reset_draw_state();

    if kernel.storage_available {
        draw_entries(kernel);
    } else {
        kernel.shell.reload_storage = true;
        kernel.show_error(RuntimeState::Shell, "insert SD card");
    }

    draw_overlay(kernel);
}

// Entries ------------------------------------------------------------

fn entry_rank(entry: &StorageEntry) -> u8 {
    if entry.is_directory {
        2
    } else if entry.is_program {
        1
    } else {
        0
    }
}

fn refresh_directory_entries(kernel: &mut Kernel) {
    kernel.shell.entries.clear();
    kernel.shell.selected_entry = 0;

    let path = kernel.shell.directory_path.clone();
    if kernel.drivers.storage.open_directory(&path) {
        while kernel.shell.entries.len() < MAX_DIRECTORY_ENTRIES {
            let Some(entry) = kernel.drivers.storage.read_directory() else {
                break;
            };
            kernel.shell.entries.push(entry);
        }

        kernel.drivers.storage.close_directory();

        kernel.shell.entries.sort_by(|a, b| {
            entry_rank(b)
                .cmp(&entry_rank(a))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
    }

    update_current_entry_path(kernel);
    update_draw_indexes(kernel);
}

fn reset_entries(kernel: &mut Kernel) {
    kernel.shell.directory_path.clear();
    kernel.shell.entry_path.clear();
    refresh_directory_entries(kernel);
}

fn update_current_entry_path(kernel: &mut Kernel) {
    let shell = &mut kernel.shell;
    shell.entry_path.clear();

    if let Some(entry) = shell.entries.get(shell.selected_entry) {
        shell.entry_path = format!("{}/{}", shell.directory_path, entry.name);
    }
}

fn update_draw_indexes(kernel: &mut Kernel) {
    let shell = &mut kernel.shell;
    let entries_per_page = (SCREEN_HEIGHT - shell.bar_height * 2) / (assets::FONT_CHAR_HEIGHT as i32 + 1);
    let count = shell.entries.len() as i32;

    if count <= entries_per_page {
        shell.first_entry = 0;
        shell.last_entry = count - 1;
        return;
    }

    shell.first_entry = shell.selected_entry as i32 - entries_per_page / 2;

    if shell.first_entry < 0 {
        shell.first_entry = 0;
    }

    shell.last_entry = shell.first_entry + entries_per_page - 1;

    if shell.last_entry >= count {
        shell.last_entry = count - 1;
        shell.first_entry = shell.last_entry - entries_per_page + 1;
    }
}

fn select_previous_entry(kernel: &mut Kernel) {
    let shell = &mut kernel.shell;
    if shell.entries.is_empty() {
        return;
    }

    shell.selected_entry = if shell.selected_entry == 0 {
        shell.entries.len() - 1
    } else {
        shell.selected_entry - 1
    };

    update_current_entry_path(kernel);
    update_draw_indexes(kernel);
}

fn select_next_entry(kernel: &mut Kernel) {
    let shell = &mut kernel.shell;
    if shell.entries.is_empty() {
        return;
    }

    shell.selected_entry = if shell.selected_entry == shell.entries.len() - 1 {
        0
    } else {
        shell.selected_entry + 1
    };

    update_current_entry_path(kernel);
    update_draw_indexes(kernel);
}

// Directories --------------------------------------------------------

fn enter_parent_directory(kernel: &mut Kernel) {
    if !kernel.storage_available || kernel.shell.directory_path.is_empty() {
        return;
    }

    match kernel.shell.directory_path.rfind('/') {
        Some(position) => kernel.shell.directory_path.truncate(position),
        None => {
            kernel.shell.directory_path.clear();
            kernel.shell.entry_path.clear();
        }
    }

    refresh_directory_entries(kernel);
}

fn enter_selected_directory(kernel: &mut Kernel) {
    let shell = &kernel.shell;
    if !kernel.storage_available {
        return;
    }

    let Some(entry) = shell.entries.get(shell.selected_entry) else {
        return;
    };
    if !entry.is_directory {
        return;
    }

    let name = entry.name.clone();
    kernel.shell.directory_path.push('/');
    kernel.shell.directory_path.push_str(&name);

    refresh_directory_entries(kernel);
}

// Shell --------------------------------------------------------------

fn load_game(kernel: &mut Kernel) {
    let path = kernel.shell.entry_path.clone();

    if !kernel.drivers.storage.open_file(&path) {
        kernel.show_error(RuntimeState::Shell, "file error");
        return;
    }

    let loaded = kernel.vm.load_program(kernel.drivers.storage.as_mut());
    kernel.drivers.storage.close_file();

    match loaded {
        Ok(()) => {
            kernel.engine.reset();
            let seed = kernel.drivers.clock.tick() as u32;
            kernel.vm.seed_random(seed);
            kernel.change_state(RuntimeState::InGame);
        }
        Err(error) => {
            eprintln!("program load failed ({}): {}", path, error);
            kernel.show_error(RuntimeState::Shell, "program load error");
        }
    }
}

fn handle_input(kernel: &mut Kernel) {
    if kernel.input.just_pressed(buttons::UP) {
        select_previous_entry(kernel);
        return;
    }

    if kernel.input.just_pressed(buttons::DOWN) {
        select_next_entry(kernel);
        return;
    }

    if kernel.input.just_pressed(buttons::B) {
        enter_parent_directory(kernel);
        return;
    }

    if kernel.input.just_pressed(buttons::A) {
        let Some(entry) = kernel.shell.entries.get(kernel.shell.selected_entry) else {
            return;
        };

        if entry.is_directory {
            enter_selected_directory(kernel);
        } else if entry.is_program {
            load_game(kernel);
        }
    }
}

// User interface -----------------------------------------------------

fn draw_entries(kernel: &mut Kernel) {
    kernel.graphics.set_transparent_color(0);

    let font = BitmapFont::default_font();
    let bar_height = kernel.shell.bar_height;
    let mut current_y = bar_height + 1;

    let first = kernel.shell.first_entry.max(0);
    let last = kernel.shell.last_entry;

    for entry_index in first..=last {
        let Some(entry) = kernel.shell.entries.get(entry_index as usize) else {
            break;
        };
        let entry = entry.clone();

        if entry_index as usize == kernel.shell.selected_entry {
            kernel.graphics.draw_rectangle(
                &Rect::new(0, current_y, SCREEN_WIDTH, bar_height),
                kernel.shell.selection_color,
            );
        }

        if entry.is_directory {
            let icon = assets::folder_icon();
            let clip = Rect::new(0, 0, icon.width as i32, icon.height as i32);
            kernel.graphics.draw_image(&icon, 1, current_y, &clip);
        } else if entry.is_program {
            let icon = assets::program_icon();
            let clip = Rect::new(0, 0, icon.width as i32, icon.height as i32);
            kernel.graphics.draw_image(&icon, 1, current_y, &clip);
        } else {
            let disabled = kernel.shell.disabled_color;
            kernel.graphics.set_foreground_color(disabled as u16);
        }

        kernel
            .graphics
            .draw_text(&font, 9, current_y + 1, entry.name.as_bytes());
        kernel.graphics.set_foreground_color(COLOR_NONE);

        current_y += bar_height;
    }

    if kernel.shell.first_entry > 0 {
        kernel.graphics.set_draw_anchor(anchor::TOP | anchor::RIGHT);
        kernel
            .graphics
            .draw_text(&font, SCREEN_WIDTH - 1, bar_height + 1, b"^");
    }

    if kernel.shell.last_entry >= 0
        && (kernel.shell.last_entry as usize) < kernel.shell.entries.len().saturating_sub(1)
    {
        kernel.graphics.set_draw_anchor(anchor::BOTTOM | anchor::RIGHT);
        kernel.graphics.draw_text(
            &font,
            SCREEN_WIDTH - 1,
            SCREEN_HEIGHT - bar_height - 1,
            b"v",
        );
    }

    kernel.graphics.set_draw_anchor(anchor::DEFAULT);
}

fn draw_overlay(kernel: &mut Kernel) {
    let left_option = if kernel.shell.directory_path.is_empty() {
        None
    } else {
        Some("(B) Back")
    };

    let right_option = kernel
        .shell
        .entries
        .get(kernel.shell.selected_entry)
        .and_then(|entry| {
            if entry.is_program {
                Some("Play (A)")
            } else if entry.is_directory {
                Some("Enter (A)")
            } else {
                None
            }
        });

    draw_shell_overlay(kernel, Some("Portatil"), left_option, right_option);
}

/// Draw the title bar (with battery gauge) and the bottom option bar.
/// Shared with the pause menu.
pub(crate) fn draw_shell_overlay(
    kernel: &mut Kernel,
    title: Option<&str>,
    left_option: Option<&str>,
    right_option: Option<&str>,
) {
    let font = BitmapFont::default_font();
    let bar_height = kernel.shell.bar_height;
    let bar_color = kernel.shell.bar_color;

    kernel.graphics.save_draw_state();
    kernel.graphics.reset_draw_state();
    kernel.graphics.set_transparent_color(0);

    if let Some(title) = title {
        kernel
            .graphics
            .draw_rectangle(&Rect::new(0, 0, SCREEN_WIDTH, bar_height), bar_color);
        kernel.graphics.draw_text(&font, 1, 1, title.as_bytes());
        kernel.draw_battery_indicator();
    }

    kernel.graphics.set_draw_anchor(anchor::BOTTOM | anchor::LEFT);
    kernel.graphics.draw_rectangle(
        &Rect::new(0, SCREEN_HEIGHT, SCREEN_WIDTH, bar_height),
        bar_color,
    );

    if let Some(left_option) = left_option {
        kernel
            .graphics
            .draw_text(&font, 1, SCREEN_HEIGHT, left_option.as_bytes());
    }

    if let Some(right_option) = right_option {
        kernel.graphics.set_draw_anchor(anchor::BOTTOM | anchor::RIGHT);
        kernel
            .graphics
            .draw_text(&font, SCREEN_WIDTH, SCREEN_HEIGHT, right_option.as_bytes());
    }

    kernel.graphics.restore_draw_state();
}
