// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike, Weekday};
use cosmic::iced_futures::stream;
use cosmic::widget::Id;
use cosmic::{
    app,
    applet::{cosmic_panel_config::PanelAnchor, menu_button, padded_control},
    cosmic_theme::Spacing,
    iced::{
        futures::{channel::mpsc, SinkExt, StreamExt},
        platform_specific::shell::wayland::commands::popup::{destroy_popup, get_popup},
        widget::{column, row, vertical_space},
        window, Alignment, Length, Rectangle, Subscription,
    },
    iced_widget::Column,
    theme,
    widget::{
        autosize, button, container, divider, grid, horizontal_space, icon, rectangle_tracker::*,
        text, Button, Grid, Space,
    },
    Apply, Element, Task,
};
use logind_zbus::manager::ManagerProxy;
use std::sync::LazyLock;
use tokio::{sync::watch, time};

use crate::{
    age::{self, AgeBreakdown, AgeError},
    cadence::Cadence,
    calendar::get_calendar_first,
    config::AgeAppletConfig,
    fl,
};
use icu::{
    calendar::Gregorian,
    datetime::{
        fieldsets,
        input::{Date, DateTime, Time},
        DateTimeFormatter, DateTimeFormatterPreferences,
    },
    decimal::{
        input::Decimal, options::DecimalFormatterOptions, DecimalFormatter,
        DecimalFormatterPreferences,
    },
    locale::Locale,
};

static AUTOSIZE_MAIN_ID: LazyLock<Id> = LazyLock::new(|| Id::new("autosize-main"));

fn get_system_locale() -> Locale {
    for var in ["LC_TIME", "LC_ALL", "LANG"] {
        if let Ok(locale_str) = std::env::var(var) {
            let cleaned_locale = locale_str
                .split('.')
                .next()
                .unwrap_or(&locale_str)
                .replace('_', "-");

            if let Ok(locale) = Locale::try_from_str(&cleaned_locale) {
                return locale;
            }

            // Try language-only fallback (e.g., "en" from "en-US")
            if let Some(lang) = cleaned_locale.split('-').next() {
                if let Ok(locale) = Locale::try_from_str(lang) {
                    return locale;
                }
            }
        }
    }
    tracing::warn!("No valid locale found in environment, using fallback");
    Locale::try_from_str("en-US").expect("Failed to parse fallback locale 'en-US'")
}

pub struct Window {
    core: cosmic::app::Core,
    popup: Option<window::Id>,
    now: NaiveDateTime,
    date_today: NaiveDate,
    date_selected: NaiveDate,
    /// Date the displayed breakdown was calculated for. The live seconds
    /// counter is keyed to this, not to the calendar cursor.
    computed_for: Option<NaiveDate>,
    breakdown: Option<AgeBreakdown>,
    last_error: Option<AgeError>,
    cadence: Cadence,
    rectangle_tracker: Option<RectangleTracker<u32>>,
    rectangle: Rectangle,
    config: AgeAppletConfig,
    locale: Locale,
}

#[derive(Debug, Clone)]
pub enum Message {
    TogglePopup,
    CloseRequested(window::Id),
    Tick,
    Rectangle(RectangleUpdate<u32>),
    SelectDay(u32),
    PreviousMonth,
    NextMonth,
    Calculate,
    ConfigChanged(AgeAppletConfig),
}

impl Window {
    fn create_datetime<D: Datelike>(&self, date: &D) -> DateTime<Gregorian> {
        DateTime {
            date: Date::try_new_gregorian(date.year(), date.month() as u8, date.day() as u8)
                .unwrap(),
            time: Time::try_new(
                self.now.hour() as u8,
                self.now.minute() as u8,
                self.now.second() as u8,
                0,
            )
            .unwrap(),
        }
    }

    fn calendar_grid(&self) -> Grid<'_, Message> {
        let mut calendar: Grid<'_, Message> = grid().width(Length::Fill);
        let first_day_of_week =
            Weekday::try_from(self.config.first_day_of_week).unwrap_or(Weekday::Sun);

        let first_day = get_calendar_first(
            self.date_selected.year(),
            self.date_selected.month(),
            first_day_of_week,
        );

        let day_iter = first_day.iter_days();
        let prefs = DateTimeFormatterPreferences::from(self.locale.clone());
        let weekday = DateTimeFormatter::try_new(prefs, fieldsets::E::short()).unwrap();

        for date in day_iter.take(7) {
            let datetime = self.create_datetime(&date);
            calendar = calendar.push(
                text::caption(weekday.format(&datetime).to_string())
                    .apply(container)
                    .center_x(Length::Fixed(44.0)),
            );
        }
        calendar = calendar.insert_row();

        let mut day_iter = first_day.iter_days();
        for i in 0..42 {
            if i > 0 && i % 7 == 0 {
                calendar = calendar.insert_row();
            }

            let date = day_iter.next().unwrap();
            let is_month = date.month() == self.date_selected.month()
                && date.year_ce() == self.date_selected.year_ce();
            let is_day = date.day() == self.date_selected.day() && is_month;
            let is_today = date == self.date_today;

            calendar = calendar.push(date_button(date.day(), is_month, is_day, is_today));
        }

        calendar
    }

    fn results_grid(&self, breakdown: &AgeBreakdown) -> Element<'_, Message> {
        let rows = [
            (fl!("years"), self.format_count(i64::from(breakdown.years))),
            (fl!("months"), self.format_count(i64::from(breakdown.months))),
            (fl!("days"), self.format_count(breakdown.days)),
            (fl!("hours"), self.format_count(breakdown.hours)),
            (fl!("minutes"), self.format_count(breakdown.minutes)),
            (fl!("seconds"), self.format_count(breakdown.seconds)),
        ];

        let mut results: Grid<'_, Message> = grid().width(Length::Fill);
        for (i, (label, value)) in rows.into_iter().enumerate() {
            if i > 0 {
                results = results.insert_row();
            }
            results = results
                .push(text::body(label))
                .push(text::body(value).apply(container).center_x(Length::Fill));
        }

        results.padding([0, 20].into()).into()
    }

    /// Locale-grouped rendering of a counter value; the engine hands over
    /// plain integers.
    fn format_count(&self, value: i64) -> String {
        let prefs = DecimalFormatterPreferences::from(self.locale.clone());
        DecimalFormatter::try_new(prefs, DecimalFormatterOptions::default())
            .map(|formatter| formatter.format(&Decimal::from(value)).to_string())
            .unwrap_or_else(|_| value.to_string())
    }

    fn panel_label(&self) -> String {
        match self.breakdown.filter(|_| self.config.show_age_in_panel) {
            Some(breakdown) => fl!("panel-years", years = breakdown.years),
            None => fl!("age"),
        }
    }

    fn vertical_layout(&self) -> Element<'_, Message> {
        let elements: Vec<Element<'_, Message>> = self
            .panel_label()
            .split_whitespace()
            .map(|piece| self.core.applet.text(piece.to_owned()).into())
            .collect();

        let label_col = Column::with_children(elements)
            .align_x(Alignment::Center)
            .spacing(4);

        Element::from(
            column!(
                label_col,
                horizontal_space().width(Length::Fixed(
                    (self.core.applet.suggested_size(true).0
                        + 2 * self.core.applet.suggested_padding(true).1)
                        as f32
                ))
            )
            .align_x(Alignment::Center),
        )
    }

    fn horizontal_layout(&self) -> Element<'_, Message> {
        Element::from(
            row!(
                self.core.applet.text(self.panel_label()),
                container(vertical_space().height(Length::Fixed(
                    (self.core.applet.suggested_size(true).1
                        + 2 * self.core.applet.suggested_padding(true).1)
                        as f32
                )))
            )
            .align_y(Alignment::Center),
        )
    }

    fn reject(&mut self, err: AgeError) {
        match &err {
            AgeError::Unexpected(detail) => {
                // Full detail goes to the log only; the popup shows a
                // generic message.
                tracing::error!(date = %self.date_selected, %detail, "age calculation failed");
            }
            recoverable => {
                tracing::error!(date = %self.date_selected, "{recoverable}");
            }
        }
        self.last_error = Some(err);
    }
}

impl cosmic::Application for Window {
    type Message = Message;
    type Executor = cosmic::SingleThreadExecutor;
    type Flags = ();
    const APP_ID: &'static str = "com.system76.CosmicAppletAge";

    fn init(core: app::Core, _flags: Self::Flags) -> (Self, app::Task<Self::Message>) {
        let locale = get_system_locale();

        let now = Local::now().naive_local();
        let today = now.date();

        (
            Self {
                core,
                popup: None,
                now,
                date_today: today,
                date_selected: today,
                computed_for: None,
                breakdown: None,
                last_error: None,
                cadence: Cadence::new(),
                rectangle_tracker: None,
                rectangle: Rectangle::default(),
                config: AgeAppletConfig::default(),
                locale,
            },
            Task::none(),
        )
    }

    fn core(&self) -> &cosmic::app::Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut cosmic::app::Core {
        &mut self.core
    }

    fn style(&self) -> Option<cosmic::iced_runtime::Appearance> {
        Some(cosmic::applet::style())
    }

    fn subscription(&self) -> Subscription<Message> {
        fn tick_subscription(
            mut target: watch::Receiver<Option<NaiveDate>>,
        ) -> Subscription<Message> {
            Subscription::run_with_id(
                "age-tick-sub",
                stream::channel(1, |mut output| async move {
                    // Mark the receiver's state as changed so the loop below
                    // picks up the current target on startup
                    target.mark_changed();
                    let period = time::Duration::from_secs(1);
                    let mut timer = time::interval(period);
                    timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
                    let mut active = false;

                    loop {
                        tokio::select! {
                            _ = timer.tick(), if active => {
                                #[cfg(debug_assertions)]
                                if let Err(err) = output.send(Message::Tick).await {
                                    tracing::error!(?err, "Failed sending tick request to applet");
                                }
                                #[cfg(not(debug_assertions))]
                                let _ = output.send(Message::Tick).await;
                            },
                            Ok(()) = target.changed() => {
                                active = target.borrow_and_update().is_some();
                                if active {
                                    // Start counting a full period from the
                                    // moment the cadence was (re)started
                                    timer = time::interval_at(time::Instant::now() + period, period);
                                    timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
                                }
                            }
                        }
                    }
                }),
            )
        }

        // Refresh the counter when waking from sleep
        async fn wake_from_sleep(output: &mut mpsc::Sender<Message>) -> zbus::Result<()> {
            let connection = zbus::Connection::system().await?;
            let proxy = ManagerProxy::new(&connection).await?;

            while let Some(property) = proxy.receive_prepare_for_sleep().await?.next().await {
                let waking = !property.args()?.start();
                if waking {
                    let _ = output.send(Message::Tick).await;
                }
            }
            Ok(())
        }

        fn wake_from_sleep_subscription() -> Subscription<Message> {
            Subscription::run_with_id(
                "wake-from-suspend-sub",
                stream::channel(1, |mut output| async move {
                    if let Err(err) = wake_from_sleep(&mut output).await {
                        tracing::error!(?err, "Failed to subscribe to wake-from-sleep signal");
                    }
                }),
            )
        }

        Subscription::batch([
            rectangle_tracker_subscription(0).map(|e| Message::Rectangle(e.1)),
            tick_subscription(self.cadence.watch()),
            wake_from_sleep_subscription(),
            self.core.watch_config(Self::APP_ID).map(|u| {
                for err in u.errors {
                    tracing::error!(?err, "Error watching config");
                }
                Message::ConfigChanged(u.config)
            }),
        ])
    }

    fn update(&mut self, message: Self::Message) -> app::Task<Self::Message> {
        match message {
            Message::TogglePopup => {
                if let Some(p) = self.popup.take() {
                    destroy_popup(p)
                } else {
                    self.now = Local::now().naive_local();
                    self.date_today = self.now.date();
                    if self.computed_for.is_none() {
                        self.date_selected = self.date_today;
                    }

                    let new_id = window::Id::unique();
                    self.popup = Some(new_id);

                    let mut popup_settings = self.core.applet.get_popup_settings(
                        self.core.main_window_id().unwrap(),
                        new_id,
                        None,
                        None,
                        None,
                    );
                    let Rectangle {
                        x,
                        y,
                        width,
                        height,
                    } = self.rectangle;
                    popup_settings.positioner.anchor_rect = Rectangle::<i32> {
                        x: x.max(1.) as i32,
                        y: y.max(1.) as i32,
                        width: width.max(1.) as i32,
                        height: height.max(1.) as i32,
                    };

                    popup_settings.positioner.size = None;

                    get_popup(popup_settings)
                }
            }
            Message::Tick => {
                self.now = Local::now().naive_local();
                self.date_today = self.now.date();
                if let Some(selected) = self.computed_for {
                    match age::elapsed_seconds(selected, self.now) {
                        Ok(seconds) => {
                            if let Some(breakdown) = self.breakdown.as_mut() {
                                breakdown.seconds = seconds;
                            }
                        }
                        Err(err) => {
                            // The clock stepped backwards past the selection;
                            // freeze the counter instead of going negative
                            tracing::error!(date = %selected, "{err}");
                            self.cadence.cancel();
                        }
                    }
                }
                Task::none()
            }
            Message::Rectangle(u) => {
                match u {
                    RectangleUpdate::Rectangle(r) => {
                        self.rectangle = r.1;
                    }
                    RectangleUpdate::Init(tracker) => {
                        self.rectangle_tracker = Some(tracker);
                    }
                }
                Task::none()
            }
            Message::CloseRequested(id) => {
                if Some(id) == self.popup {
                    self.popup = None;
                }
                Task::none()
            }
            Message::SelectDay(day) => {
                if let Some(date) = self.date_selected.with_day(day) {
                    if self.computed_for != Some(date) {
                        self.cadence.cancel();
                    }
                    self.date_selected = date;
                    self.last_error = None;
                } else {
                    tracing::error!(day, "invalid day selection");
                    self.last_error = Some(AgeError::Selection);
                }
                Task::none()
            }
            Message::PreviousMonth => {
                if let Some(date) = self
                    .date_selected
                    .checked_sub_months(chrono::Months::new(1))
                {
                    self.date_selected = date;
                } else {
                    tracing::error!("invalid naivedate");
                }
                Task::none()
            }
            Message::NextMonth => {
                if let Some(date) = self
                    .date_selected
                    .checked_add_months(chrono::Months::new(1))
                {
                    self.date_selected = date;
                } else {
                    tracing::error!("invalid naivedate");
                }
                Task::none()
            }
            Message::Calculate => {
                self.now = Local::now().naive_local();
                let result = age::compute(self.date_selected, self.now).and_then(|mut breakdown| {
                    breakdown.seconds = age::elapsed_seconds(self.date_selected, self.now)?;
                    Ok(breakdown)
                });
                match result {
                    Ok(breakdown) => {
                        tracing::info!(date = %self.date_selected, "calculated age");
                        self.breakdown = Some(breakdown);
                        self.computed_for = Some(self.date_selected);
                        self.last_error = None;
                        self.cadence.start(self.date_selected);
                    }
                    Err(err) => self.reject(err),
                }
                Task::none()
            }
            Message::ConfigChanged(c) => {
                self.config = c;
                Task::none()
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let horizontal = matches!(
            self.core.applet.anchor,
            PanelAnchor::Top | PanelAnchor::Bottom
        );

        let button = button::custom(if horizontal {
            self.horizontal_layout()
        } else {
            self.vertical_layout()
        })
        .padding(if horizontal {
            [0, self.core.applet.suggested_padding(true).0]
        } else {
            [self.core.applet.suggested_padding(true).0, 0]
        })
        .on_press_down(Message::TogglePopup)
        .class(cosmic::theme::Button::AppletIcon);

        autosize::autosize(
            if let Some(tracker) = self.rectangle_tracker.as_ref() {
                Element::from(tracker.container(0, button).ignore_bounds(true))
            } else {
                button.into()
            },
            AUTOSIZE_MAIN_ID.clone(),
        )
        .into()
    }

    fn view_window(&self, _id: window::Id) -> Element<'_, Message> {
        let Spacing {
            space_xxs, space_s, ..
        } = theme::active().cosmic().spacing;

        let datetime = self.create_datetime(&self.date_selected);
        let prefs = DateTimeFormatterPreferences::from(self.locale.clone());

        let date = text(
            DateTimeFormatter::try_new(prefs, fieldsets::YMD::long())
                .unwrap()
                .format(&datetime)
                .to_string(),
        )
        .size(18);
        let day_of_week = text::body(
            DateTimeFormatter::try_new(prefs, fieldsets::E::long())
                .unwrap()
                .format(&datetime)
                .to_string(),
        );

        let month_controls = row![
            button::icon(icon::from_name("go-previous-symbolic"))
                .padding(8)
                .on_press(Message::PreviousMonth),
            button::icon(icon::from_name("go-next-symbolic"))
                .padding(8)
                .on_press(Message::NextMonth)
        ]
        .spacing(8);

        let calendar = self.calendar_grid();

        let mut content_list = column![
            row![
                column![date, day_of_week],
                Space::with_width(Length::Fill),
                month_controls,
            ]
            .align_y(Alignment::Center)
            .padding([12, 20]),
            calendar.padding([0, 12].into()),
            padded_control(divider::horizontal::default()).padding([space_xxs, space_s]),
            menu_button(text::body(fl!("calculate"))).on_press(Message::Calculate),
        ]
        .padding([8, 0]);

        if let Some(err) = self.last_error.as_ref() {
            content_list = content_list
                .push(container(text::caption(error_text(err))).padding([4, 20]));
        }

        if let Some(breakdown) = self.breakdown.as_ref() {
            content_list = content_list
                .push(padded_control(divider::horizontal::default()).padding([space_xxs, space_s]))
                .push(self.results_grid(breakdown));
        }

        self.core
            .applet
            .popup_container(container(content_list))
            .into()
    }

    fn on_close_requested(&self, id: window::Id) -> Option<Message> {
        Some(Message::CloseRequested(id))
    }
}

fn error_text(err: &AgeError) -> String {
    match err {
        AgeError::FutureDate => fl!("future-date-error"),
        AgeError::Selection => fl!("invalid-selection-error"),
        AgeError::Unexpected(_) => fl!("unexpected-error"),
    }
}

fn date_button(day: u32, is_month: bool, is_day: bool, is_today: bool) -> Button<'static, Message> {
    let style = if is_day {
        button::ButtonClass::Suggested
    } else if is_today {
        button::ButtonClass::Standard
    } else {
        button::ButtonClass::Text
    };

    let button = button::custom(
        text::body(format!("{day}"))
            .apply(container)
            .center(Length::Fill),
    )
    .class(style)
    .height(Length::Fixed(44.0))
    .width(Length::Fixed(44.0));

    if is_month {
        button.on_press(Message::SelectDay(day))
    } else {
        button
    }
}
