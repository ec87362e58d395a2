use eframe::egui::{Button, Frame, Response, RichText, Sense, Stroke, Ui, Vec2, Widget};
use wonder_lib::{
    player::{Player, PlayerColor},
    roster::RosterAction,
};

use super::PADDING;

/// A card for one player, painted in the player's color.
pub struct PlayerCard<'a> {
    player: &'a Player,
    index: usize,
}

impl<'a> PlayerCard<'a> {
    pub fn new(player: &'a Player, index: usize) -> Self {
        Self { player, index }
    }

    /// Shows the card and returns the action for whichever control was clicked.
    pub fn show(self, ui: &mut Ui) -> Option<RosterAction> {
        let PlayerCard { player, index } = self;
        let text_color = player.color.contrast();
        let mut action = None;

        Frame::none()
            .fill(player.color.color())
            .rounding(4.)
            .inner_margin(PADDING)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(&player.name).heading().color(text_color));
                ui.label(
                    RichText::new(format!("Turn Order: {}", player.turn_order)).color(text_color),
                );

                ui.horizontal(|ui| {
                    let control = |text: &str| {
                        Button::new(RichText::new(text).color(text_color)).frame(false)
                    };
                    if ui.add(control("⬆")).on_hover_text("Move up").clicked() {
                        action = Some(RosterAction::MoveUp(index));
                    }
                    if ui.add(control("⬇")).on_hover_text("Move down").clicked() {
                        action = Some(RosterAction::MoveDown(index));
                    }
                    if ui.add(control("Remove")).clicked() {
                        action = Some(RosterAction::Remove(player.id));
                    }
                });
            });

        action
    }
}

/// A small filled circle of a palette color.
pub struct Swatch(pub PlayerColor);

impl Widget for Swatch {
    fn ui(self, ui: &mut Ui) -> Response {
        let size = ui.spacing().interact_size.y;
        let (rect, response) = ui.allocate_exact_size(Vec2::splat(size), Sense::hover());

        if ui.is_rect_visible(rect) {
            let stroke = Stroke::new(1., ui.visuals().widgets.noninteractive.fg_stroke.color);
            ui.painter()
                .circle(rect.center(), size / 2. - 1., self.0.color(), stroke);
        }

        response
    }
}
