use serenity::builder::{CreateActionRow, CreateButton};
use serenity::model::application::ButtonStyle;

pub const PAUSE: &str = "music_pause";
pub const RESUME: &str = "music_resume";
pub const SKIP: &str = "music_skip";
pub const STOP: &str = "music_stop";

pub fn music_buttons(is_paused: bool, disabled: bool) -> CreateActionRow {
    let pause_resume = if is_paused {
        CreateButton::new(RESUME)
            .label("Resume")
            .emoji('▶')
            .style(ButtonStyle::Success)
    } else {
        CreateButton::new(PAUSE)
            .label("Pause")
            .emoji('⏸')
            .style(ButtonStyle::Primary)
    };

    let skip = CreateButton::new(SKIP)
        .label("Skip")
        .emoji('⏭')
        .style(ButtonStyle::Secondary);

    let stop = CreateButton::new(STOP)
        .label("Stop")
        .emoji('⏹')
        .style(ButtonStyle::Danger);

    CreateActionRow::Buttons(
        [pause_resume, skip, stop]
            .into_iter()
            .map(|b| b.disabled(disabled))
            .collect(),
    )
}

pub fn music_components(is_paused: bool) -> Vec<CreateActionRow> {
    vec![music_buttons(is_paused, false)]
}

pub fn music_components_disabled() -> Vec<CreateActionRow> {
    vec![music_buttons(false, true)]
}
