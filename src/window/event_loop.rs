use super::Window;
use super::surface::VideoSurface;
use anyhow::{Result, anyhow};
use iced::widget::{Stack, container, text};
use iced::{
    Background, Color, Element, Length, Padding, Size, Subscription, Task, event, keyboard,
    window,
};
use std::cell::RefCell;
use std::rc::Rc;

pub(super) type FrameCallback = Box<dyn FnMut(&mut Window)>;

#[derive(Debug, Clone)]
pub(super) enum Message {
    Frame,
    Resized(Size),
    Quit,
}

struct LoopState {
    window: Window,
    on_frame: FrameCallback,
}

/// iced program state. Shares the loop state with [`run`] so the window
/// can be handed back to the caller once iced returns.
struct Session {
    state: Rc<RefCell<LoopState>>,
}

impl Session {
    fn title(&self) -> String {
        self.state.borrow().window.config().title.clone()
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let mut state = self.state.borrow_mut();
        let LoopState { window, on_frame } = &mut *state;

        match message {
            Message::Frame => {
                if window.is_running() {
                    on_frame(window);
                }
            }
            Message::Resized(size) => {
                window.resize(size.width.round() as u32, size.height.round() as u32);
            }
            Message::Quit => {
                log::debug!("Quit requested");
                window.quit();
            }
        }

        if window.is_running() {
            Task::none()
        } else {
            iced::exit()
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let state = self.state.borrow();
        let window = &state.window;
        let scene = window.presented();
        let font_size = window.config().font_size as f32;

        let mut layers: Vec<Element<'_, Message>> = Vec::with_capacity(scene.texts.len() + 1);

        if let (Some(dest), Some(texture)) = (scene.video, window.texture()) {
            layers.push(VideoSurface::new(texture, dest).into());
        }

        if let Some(font) = window.font() {
            for item in &scene.texts {
                let label = text(item.text.clone())
                    .font(font)
                    .size(font_size)
                    .color(item.color);
                layers.push(
                    container(label)
                        .padding(Padding {
                            top: item.y.max(0) as f32,
                            right: 0.0,
                            bottom: 0.0,
                            left: item.x.max(0) as f32,
                        })
                        .into(),
                );
            }
        }

        container(
            Stack::with_children(layers)
                .width(Length::Fill)
                .height(Length::Fill),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .style(|_| container::Style {
            background: Some(Background::Color(Color::BLACK)),
            ..Default::default()
        })
        .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            window::frames().map(|_| Message::Frame),
            event::listen_with(handle_event),
        ])
    }
}

fn handle_event(event: iced::Event, _status: event::Status, _id: window::Id) -> Option<Message> {
    match event {
        iced::Event::Window(window::Event::CloseRequested) => Some(Message::Quit),
        iced::Event::Window(window::Event::Resized(size)) => Some(Message::Resized(size)),
        iced::Event::Keyboard(keyboard::Event::KeyPressed {
            key: keyboard::Key::Named(keyboard::key::Named::Escape),
            ..
        }) => Some(Message::Quit),
        _ => None,
    }
}

/// Drive `window` with the iced event loop until it stops running.
pub(super) fn run(window: &mut Window, on_frame: FrameCallback) -> Result<()> {
    if !window.is_initialized() {
        return Err(anyhow!("window is not initialized"));
    }

    let rect = window.window_rect();
    let settings = window::Settings {
        size: Size::new(rect.w as f32, rect.h as f32),
        resizable: true,
        exit_on_close_request: false,
        ..Default::default()
    };

    window.running = true;
    let state = Rc::new(RefCell::new(LoopState {
        window: std::mem::take(window),
        on_frame,
    }));

    let boot_state = Rc::clone(&state);
    let result = iced::application(
        move || Session {
            state: Rc::clone(&boot_state),
        },
        Session::update,
        Session::view,
    )
    .title(Session::title)
    .window(settings)
    .subscription(Session::subscription)
    .run();

    // hand the window back, iced may still hold a session clone
    std::mem::swap(window, &mut state.borrow_mut().window);
    window.running = false;

    result.map_err(|e| {
        log::error!("Failed to run window event loop, error: {}", e);
        anyhow!("window event loop failed: {}", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Rect;

    fn session(window: Window) -> Session {
        Session {
            state: Rc::new(RefCell::new(LoopState {
                window,
                on_frame: Box::new(|w: &mut Window| w.add_text("tick", 0, 0, Color::WHITE)),
            })),
        }
    }

    #[test]
    fn test_run_requires_init() {
        let mut window = Window::default();
        assert!(run(&mut window, Box::new(|_| {})).is_err());
    }

    #[test]
    fn test_frame_invokes_callback_while_running() {
        let mut window = Window::default();
        window.init(320, 240, 4, 4).unwrap();
        window.running = true;

        let mut session = session(window);
        let _ = session.update(Message::Frame);
        session.state.borrow_mut().window.render();
        assert_eq!(session.state.borrow().window.presented().texts.len(), 1);
    }

    #[test]
    fn test_frame_skips_callback_when_stopped() {
        let mut window = Window::default();
        window.init(320, 240, 4, 4).unwrap();

        let mut session = session(window);
        let _ = session.update(Message::Frame);
        session.state.borrow_mut().window.render();
        assert!(session.state.borrow().window.presented().is_empty());
    }

    #[test]
    fn test_quit_and_resize_messages() {
        let mut window = Window::default();
        window.init(320, 240, 4, 4).unwrap();
        window.running = true;

        let mut session = session(window);
        let _ = session.update(Message::Resized(Size::new(640.0, 480.0)));
        assert_eq!(
            session.state.borrow().window.window_rect(),
            Rect::sized(640, 480)
        );

        let _ = session.update(Message::Quit);
        assert!(!session.state.borrow().window.is_running());
    }

    #[test]
    fn test_handle_event() {
        let id = window::Id::unique();
        assert!(matches!(
            handle_event(
                iced::Event::Window(window::Event::CloseRequested),
                event::Status::Ignored,
                id
            ),
            Some(Message::Quit)
        ));
        assert!(matches!(
            handle_event(
                iced::Event::Window(window::Event::Resized(Size::new(1.0, 2.0))),
                event::Status::Ignored,
                id
            ),
            Some(Message::Resized(_))
        ));
        assert!(
            handle_event(
                iced::Event::Window(window::Event::Focused),
                event::Status::Ignored,
                id
            )
            .is_none()
        );
    }
}
