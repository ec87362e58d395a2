use std::thread::JoinHandle;

use eframe::egui::{
    self, Align, Align2, Button, CentralPanel, ComboBox, Context, FontFamily, FontId, Layout,
    RichText, ScrollArea, Style, TextEdit, TextStyle, TopBottomPanel, Ui, Vec2, Window,
};
use eframe::epaint::Color32;
use eframe::{App, CreationContext, Frame};
use wonder_lib::{
    link::{DeviceInfo, LinkError, LinkHandle, SendStatus, SELECT_FAILED_MESSAGE},
    player::PlayerColor,
    roster::{Roster, RosterAction},
    storage::{self, FileStorage},
};

use crate::config::Config;
use crate::gui::handle::{GuiHandle, GuiMessage, GuiReceiver};
use crate::gui::player_card::{PlayerCard, Swatch};
use crate::gui::PADDING;
use crate::link;

pub struct WonderConfig {
    roster: Roster,
    storage: FileStorage,
    link: LinkHandle,
    link_thread: Option<JoinHandle<()>>,
    gui_receiver: GuiReceiver,
    player_name: String,
    player_color: Option<PlayerColor>,
    scanning: bool,
    /// Candidates offered by the device picker while it is open.
    picker: Option<Vec<DeviceInfo>>,
    displayed_error: Option<String>,
}

impl WonderConfig {
    pub fn new(cc: &CreationContext<'_>, config: Config) -> Self {
        Self::setup(&cc.egui_ctx);

        let storage = FileStorage::new(&config.data_dir);
        let roster = storage::load_roster(&storage);

        let (gui_sender, gui_receiver) = std::sync::mpsc::channel();
        let gui_handle = GuiHandle {
            context: cc.egui_ctx.clone(),
            sender: gui_sender,
        };
        let mut displayed_error = None;
        let (link, link_thread) = match link::spawn(&config, gui_handle) {
            Ok((link, thread)) => (link, Some(thread)),
            Err(e) => {
                tracing::error!(%e, "Couldn't start link thread");
                displayed_error = Some(format!("Bluetooth is unavailable: {e}"));
                // A handle without an adapter reports every command as invalid
                (LinkHandle::new(tokio::sync::mpsc::channel(1).0), None)
            }
        };

        // Best effort, failures are only logged by the link
        if let Err(e) = link.reconnect_remembered() {
            tracing::warn!(%e, "Auto-reconnect could not be started");
        }

        Self {
            roster,
            storage,
            link,
            link_thread,
            gui_receiver,
            player_name: String::new(),
            player_color: None,
            scanning: false,
            picker: None,
            displayed_error,
        }
    }

    fn setup(ctx: &Context) {
        let mut style = Style::default();
        style.spacing.button_padding = (PADDING, PADDING / 2.).into();
        style.spacing.item_spacing = (PADDING, PADDING).into();
        style.text_styles.insert(
            TextStyle::Heading,
            FontId {
                size: 24.,
                family: FontFamily::Proportional,
            },
        );
        style.text_styles.insert(
            TextStyle::Body,
            FontId {
                size: 16.,
                family: FontFamily::Proportional,
            },
        );
        style.text_styles.insert(
            TextStyle::Button,
            FontId {
                size: 16.,
                family: FontFamily::Proportional,
            },
        );

        ctx.set_style(style);
    }
}

impl Drop for WonderConfig {
    fn drop(&mut self) {
        // Shutdown the link thread and give it a moment to let go of the button
        self.link.shutdown();
        if let Some(thread) = self.link_thread.take() {
            link::join(thread, link::SHUTDOWN_TIMEOUT);
        }
    }
}

impl App for WonderConfig {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        // Receive link updates
        while let Ok(msg) = self.gui_receiver.try_recv() {
            match msg {
                GuiMessage::Link(state) => self.link.update(state),
                GuiMessage::Devices(devices) => {
                    self.scanning = false;
                    self.picker = Some(devices);
                }
                GuiMessage::Error(message) => {
                    self.scanning = false;
                    self.displayed_error = Some(message);
                }
            }
        }

        TopBottomPanel::top("title").show(ctx, |ui| {
            ui.add_space(PADDING);
            ui.vertical_centered(|ui| ui.heading("Slicks Wonder Button Config"));
            ui.add_space(PADDING);
        });

        TopBottomPanel::bottom("toolbar")
            // Margins look better with a "group" frame
            .frame(egui::Frame::group(&ctx.style()).fill(ctx.style().visuals.window_fill()))
            .show(ctx, |ui| {
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.small(crate::VERSION);
                    ui.small("Version");
                });
            });

        let modal_open = self.displayed_error.is_some() || self.picker.is_some();
        CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    self.add_player_form(ui);
                    ui.separator();
                    self.player_list(ui);
                    ui.separator();
                    self.link_controls(ui);
                });
            });
        });

        self.device_picker(ctx);
        self.error_dialog(ctx);
    }
}

// ----------------------------------------------------------------------------
// Roster
// ----------------------------------------------------------------------------
impl WonderConfig {
    fn add_player_form(&mut self, ui: &mut Ui) {
        ui.group(|ui| {
            ui.heading("Add a New Player");
            ui.add(
                TextEdit::singleline(&mut self.player_name)
                    .hint_text("Player Name")
                    .desired_width(f32::INFINITY),
            );

            ui.horizontal(|ui| {
                if let Some(color) = self.player_color {
                    ui.add(Swatch(color));
                }
                ComboBox::from_label("Color")
                    .selected_text(
                        self.player_color
                            .map_or("Select a color", PlayerColor::label),
                    )
                    .show_ui(ui, |ui| {
                        for color in PlayerColor::ALL {
                            ui.horizontal(|ui| {
                                ui.add(Swatch(color));
                                ui.selectable_value(
                                    &mut self.player_color,
                                    Some(color),
                                    color.label(),
                                );
                            });
                        }
                    });
            });

            let button_size = [ui.available_width(), ui.spacing().interact_size.y];
            if ui.add_sized(button_size, Button::new("Add Player")).clicked() {
                let action = RosterAction::Add {
                    name: self.player_name.clone(),
                    color: self.player_color,
                };
                if self.apply(action) {
                    self.player_name.clear();
                    self.player_color = None;
                }
            }
        });
    }

    fn player_list(&mut self, ui: &mut Ui) {
        if self.roster.is_empty() {
            ui.weak("No players yet");
            return;
        }

        let mut action = None;
        for (index, player) in self.roster.players().iter().enumerate() {
            if let Some(a) = PlayerCard::new(player, index).show(ui) {
                action = Some(a);
            }
        }
        if let Some(action) = action {
            self.apply(action);
        }
    }

    /// Applies `action` to the roster and persists it if anything changed.
    fn apply(&mut self, action: RosterAction) -> bool {
        match self.roster.apply(action) {
            Ok(true) => {
                self.roster_changed();
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.displayed_error = Some(e.to_string());
                false
            }
        }
    }

    fn roster_changed(&mut self) {
        if let Err(e) = storage::save_roster(&mut self.storage, &self.roster) {
            tracing::error!(%e, "Failed to save players");
        }
    }
}

// ----------------------------------------------------------------------------
// Link
// ----------------------------------------------------------------------------
impl WonderConfig {
    fn link_controls(&mut self, ui: &mut Ui) {
        let state = self.link.state();
        let connect_text = if state.connected {
            RichText::new("✔ Connected")
        } else {
            RichText::new("Connect to Button")
        };

        ui.horizontal(|ui| {
            let connect_button = ui.add_enabled(!self.scanning, Button::new(connect_text));
            if connect_button.clicked() {
                match self.link.discover() {
                    Ok(()) => self.scanning = true,
                    Err(e) => self.selection_failed(e),
                }
            }
            if self.scanning {
                ui.spinner();
                ui.label("Scanning...");
            }
        });

        let send_button = ui
            .add_enabled(!self.link.is_sending(), Button::new("Send Player List"))
            .on_disabled_hover_text("The player list is being sent");
        if send_button.clicked() {
            if let Err(e) = self.link.send_roster(&self.roster) {
                tracing::warn!(%e, "Player list was not sent");
                self.displayed_error = Some(e.send_message().to_owned());
            }
        }

        ui.horizontal(|ui| {
            let status = self.link.state().status;
            ui.label("Status:");
            match status {
                SendStatus::Sending => {
                    ui.spinner();
                }
                SendStatus::Success => {
                    ui.colored_label(Color32::GREEN, "✔");
                }
                SendStatus::Error => {
                    ui.colored_label(Color32::RED, "✖");
                }
                SendStatus::Idle => {
                    ui.colored_label(Color32::GRAY, "✖");
                }
            }
            ui.label(status.to_string());
        });
    }

    fn device_picker(&mut self, ctx: &Context) {
        let Some(devices) = &self.picker else {
            return;
        };

        let mut chosen = None;
        let mut cancelled = false;
        Window::new("Select a Button")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                for device in devices {
                    if ui.button(device.to_string()).clicked() {
                        chosen = Some(device.clone());
                    }
                }
                ui.separator();
                if ui.button("Cancel").clicked() {
                    cancelled = true;
                }
            });

        if let Some(device) = chosen {
            self.picker = None;
            tracing::info!(%device, "Selected device");
            if let Err(e) = self.link.select(device) {
                self.selection_failed(e);
            }
        } else if cancelled {
            self.picker = None;
            self.selection_failed(LinkError::Cancelled);
        }
    }

    fn selection_failed(&mut self, e: LinkError) {
        tracing::error!(%e, "Bluetooth device selection failed");
        self.displayed_error = Some(SELECT_FAILED_MESSAGE.to_owned());
    }

    fn error_dialog(&mut self, ctx: &Context) {
        let Some(message) = &self.displayed_error else {
            return;
        };

        let mut close = false;
        Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message.as_str());
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Close").clicked() {
                        close = true;
                    }
                });
            });
        if close {
            self.displayed_error = None;
        }
    }
}
