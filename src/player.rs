//! The frame-sequence scroll player.
//!
//! [`SequencePlayer`] ties the preloader, the render engine and the scroll
//! adapter to one surface. It never touches the host directly: every host
//! event (image completion, progress update, paint callback, resize) is fed
//! in through a method, and the return values say what the host should do
//! next.

use crate::{
    FrameRequest, FrameSet, LoadOutcome, LoadingPhase, OverlayStyle, PlayerError, PlayerResult,
    PreloadState, Preloader, RenderEngine, RenderedFrame, ScrollAdapter, ScrollUpdate,
    SequenceConfig, Surface, Viewport,
};

/// Whether the player is attached to its host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountState {
    /// Constructed, not yet mounted
    Detached,
    /// Mounted and accepting events
    Mounted,
    /// Torn down; events are ignored
    Unmounted,
}

/// What the host should do after a resize.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeOutcome {
    /// The immediate redraw, when a frame was drawable
    pub redrawn: Option<RenderedFrame>,
    /// The host must re-measure its pinned scroll range
    pub refresh_range: bool,
}

/// Scroll-synchronized image-sequence player.
///
/// ## Example
///
/// ```rust
/// use frameseq_scroll::{DrawRect, PlayerResult, SequenceConfig, SequencePlayer, Surface, Viewport};
///
/// #[derive(Default)]
/// struct NullSurface { draws: usize }
///
/// impl Surface for NullSurface {
///     type Image = ();
///     fn client_size(&self) -> (f64, f64) { (800.0, 600.0) }
///     fn resize(&mut self, _: Viewport) -> PlayerResult<()> { Ok(()) }
///     fn clear(&mut self) -> PlayerResult<()> { Ok(()) }
///     fn draw_image(&mut self, _: &(), _: DrawRect) -> PlayerResult<()> {
///         self.draws += 1;
///         Ok(())
///     }
/// }
///
/// let config = SequenceConfig { frame_count: 3, ..Default::default() };
/// let mut player = SequencePlayer::new(config, NullSurface::default())?;
/// let requests = player.mount(Viewport::new(800.0, 600.0, 1.0))?;
///
/// for request in &requests {
///     player.frame_loaded(request.index, (), 1920, 1080)?;
/// }
/// assert!(player.preload_state().is_loaded);
/// assert_eq!(player.surface().draws, 1); // first frame shown on ready
///
/// if player.scroll_progress(1.0).request_paint {
///     player.paint()?;
/// }
/// assert_eq!(player.current_frame(), 2);
/// # Ok::<(), frameseq_scroll::PlayerError>(())
/// ```
pub struct SequencePlayer<S: Surface> {
    config: SequenceConfig,
    frames: FrameSet<S::Image>,
    preloader: Preloader,
    engine: RenderEngine,
    scroll: ScrollAdapter,
    surface: S,
    viewport: Option<Viewport>,
    state: MountState,
}

impl<S: Surface> SequencePlayer<S> {
    /// Create a player for a validated configuration.
    pub fn new(config: SequenceConfig, surface: S) -> PlayerResult<Self> {
        config.validate()?;
        Ok(Self {
            frames: FrameSet::from_config(&config),
            preloader: Preloader::new(config.retry.clone()),
            engine: RenderEngine::new(),
            scroll: ScrollAdapter::new(config.frame_count, config.overlay.clone()),
            surface,
            viewport: None,
            state: MountState::Detached,
            config,
        })
    }

    /// Size the surface and start preloading.
    ///
    /// Returns one fetch request per frame; the host issues them all at once
    /// and reports each result through [`Self::frame_loaded`] or
    /// [`Self::frame_failed`].
    pub fn mount(&mut self, viewport: Viewport) -> PlayerResult<Vec<FrameRequest>> {
        match self.state {
            MountState::Unmounted => return Err(PlayerError::Unmounted),
            MountState::Mounted => return Err(PlayerError::config("player is already mounted")),
            MountState::Detached => {}
        }
        self.resize_surface(viewport)?;
        self.state = MountState::Mounted;
        Ok(self.preloader.start(&self.frames, &self.config))
    }

    /// Report a decoded frame.
    ///
    /// On the completion that finishes loading, the first frame is drawn.
    pub fn frame_loaded(&mut self, index: usize, image: S::Image, width: u32, height: u32) -> PlayerResult<LoadOutcome> {
        if self.state != MountState::Mounted {
            return Ok(LoadOutcome::Ignored);
        }
        let outcome = self.preloader.frame_loaded(&mut self.frames, index, image, width, height);
        self.after_settle(&outcome);
        Ok(outcome)
    }

    /// Report a failed or timed-out fetch.
    ///
    /// A [`LoadOutcome::Retry`] carries the request to issue again.
    pub fn frame_failed(&mut self, index: usize, reason: &str) -> PlayerResult<LoadOutcome> {
        if self.state != MountState::Mounted {
            return Ok(LoadOutcome::Ignored);
        }
        let outcome = self.preloader.frame_failed(&mut self.frames, index, reason);
        self.after_settle(&outcome);
        Ok(outcome)
    }

    // The ready transition has already happened; a failed first draw must not hide it.
    fn after_settle(&mut self, outcome: &LoadOutcome) {
        if outcome.is_ready() {
            self.scroll.note_rendered(0);
            if let Err(err) = self.engine.render(&mut self.surface, &self.frames, 0) {
                tracing::warn!(%err, "first frame draw failed");
            }
        }
    }

    fn resize_surface(&mut self, viewport: Viewport) -> PlayerResult<()> {
        match self.surface.resize(viewport) {
            Ok(()) => {}
            Err(err) if err.is_skippable() => tracing::warn!(%err, "surface not resized"),
            Err(err) => return Err(err),
        }
        self.viewport = Some(viewport);
        Ok(())
    }

    /// Feed a scroll progress value (0.0 - 1.0).
    ///
    /// Ignored until loading has finished. When the returned update asks for
    /// a paint, the host schedules one paint callback and calls
    /// [`Self::paint`] from it.
    pub fn scroll_progress(&mut self, progress: f64) -> ScrollUpdate {
        if self.state != MountState::Mounted || !self.preloader.is_ready() {
            return ScrollUpdate {
                frame: None,
                request_paint: false,
                overlay: OverlayStyle::VISIBLE,
            };
        }
        self.scroll.update(progress)
    }

    /// Draw the latest scheduled frame, if any.
    pub fn paint(&mut self) -> PlayerResult<Option<RenderedFrame>> {
        if self.state != MountState::Mounted {
            return Ok(None);
        }
        match self.scroll.take_pending() {
            Some(frame) => self.engine.render(&mut self.surface, &self.frames, frame),
            None => Ok(None),
        }
    }

    /// Resize the surface and redraw the current frame at once.
    ///
    /// A missing drawing context or a failed redraw is logged; the viewport
    /// is still recorded and the range refresh is still signalled.
    pub fn resize(&mut self, viewport: Viewport) -> PlayerResult<ResizeOutcome> {
        match self.state {
            MountState::Unmounted => return Err(PlayerError::Unmounted),
            MountState::Detached => return Err(PlayerError::config("player is not mounted")),
            MountState::Mounted => {}
        }
        self.resize_surface(viewport)?;
        tracing::debug!(width = viewport.width, height = viewport.height, dpr = viewport.device_pixel_ratio, "surface resized");

        let redrawn = if self.preloader.is_ready() {
            self.engine
                .render(&mut self.surface, &self.frames, self.scroll.current_frame())
                .unwrap_or_else(|err| {
                    tracing::warn!(%err, "redraw after resize failed");
                    None
                })
        } else {
            None
        };
        Ok(ResizeOutcome {
            redrawn,
            refresh_range: true,
        })
    }

    /// Tear down: drop pending redraws and ignore every later event.
    pub fn unmount(&mut self) {
        if self.state == MountState::Unmounted {
            return;
        }
        self.state = MountState::Unmounted;
        self.scroll.reset();
        self.preloader.reset();
        tracing::debug!(draws = self.engine.draw_count(), "player unmounted");
    }

    #[inline]
    pub fn mount_state(&self) -> MountState {
        self.state
    }

    #[inline]
    pub fn preload_state(&self) -> PreloadState {
        self.preloader.state()
    }

    #[inline]
    pub fn loading_phase(&self) -> LoadingPhase {
        self.preloader.phase()
    }

    /// Loading indicator text.
    pub fn loading_message(&self) -> String {
        self.preloader.progress().message()
    }

    /// Frame currently shown.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.scroll.current_frame()
    }

    /// Number of draws made so far.
    #[inline]
    pub fn draw_count(&self) -> u64 {
        self.engine.draw_count()
    }

    #[inline]
    pub fn frames(&self) -> &FrameSet<S::Image> {
        &self.frames
    }

    #[inline]
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    #[inline]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn has_pending_paint(&self) -> bool {
        self.scroll.has_pending()
    }
}

/// Browser binding: canvas, image loads, resize listener and
/// `requestAnimationFrame`.
#[cfg(feature = "web")]
pub mod web {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::{Rc, Weak};

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use web_sys::{HtmlCanvasElement, Window};

    use crate::loader::web::{ImageEvent, ImageFetch};
    use crate::render::web::CanvasSurface;
    use crate::{
        FrameRequest, HandleScope, LoadOutcome, OverlayStyle, PinnedRange, PlayerError,
        PlayerResult, PreloadState, ScrubSmoother, SequenceConfig, Viewport,
    };

    use super::SequencePlayer;

    type Callback<T> = Box<dyn FnMut(T)>;

    struct Inner {
        player: SequencePlayer<CanvasSurface>,
        fetches: HashMap<usize, ImageFetch>,
        retired: Vec<ImageFetch>,
        smoother: ScrubSmoother,
        range: PinnedRange,
        frame_request: Option<i32>,
        paint_closure: Option<Closure<dyn FnMut(f64)>>,
        last_paint_ms: Option<f64>,
        on_progress: Option<Callback<PreloadState>>,
        on_overlay: Option<Callback<OverlayStyle>>,
        on_refresh: Option<Box<dyn FnMut() -> f64>>,
    }

    /// A player mounted on a canvas.
    ///
    /// Dropping it (or calling [`WebPlayer::unmount`]) removes the resize
    /// listener, cancels any pending animation frame, and detaches image
    /// callbacks.
    ///
    /// Registered callbacks run while the player is borrowed and must not
    /// call back into it.
    pub struct WebPlayer {
        inner: Rc<RefCell<Inner>>,
        scope: HandleScope,
    }

    fn window() -> PlayerResult<Window> {
        web_sys::window().ok_or_else(|| PlayerError::surface_unavailable("No window available"))
    }

    fn current_viewport(window: &Window) -> Viewport {
        let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Viewport::new(width, height, window.device_pixel_ratio())
    }

    impl WebPlayer {
        /// Mount a player on `canvas` with its pinned region starting at
        /// scroll offset `pin_start`.
        pub fn mount(canvas: HtmlCanvasElement, config: SequenceConfig, pin_start: f64) -> PlayerResult<Self> {
            let window = window()?;
            let range = PinnedRange::new(pin_start, config.pinned_extent());
            let smoother = ScrubSmoother::new(config.scrub_seconds);
            let mut player = SequencePlayer::new(config, CanvasSurface::new(canvas))?;
            let requests = player.mount(current_viewport(&window))?;

            let inner = Rc::new(RefCell::new(Inner {
                player,
                fetches: HashMap::new(),
                retired: Vec::new(),
                smoother,
                range,
                frame_request: None,
                paint_closure: None,
                last_paint_ms: None,
                on_progress: None,
                on_overlay: None,
                on_refresh: None,
            }));
            let mut scope = HandleScope::new();

            // Paint callback, shared by every animation-frame request
            let paint = {
                let weak = Rc::downgrade(&inner);
                Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| on_animation_frame(&weak, timestamp))
            };
            inner.borrow_mut().paint_closure = Some(paint);

            let resize = {
                let weak = Rc::downgrade(&inner);
                Closure::<dyn FnMut()>::new(move || on_resize(&weak))
            };
            window
                .add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())
                .map_err(|_| PlayerError::surface_unavailable("Failed to add resize listener"))?;
            {
                let window = window.clone();
                scope.acquire("resize listener", move || {
                    let _ = window.remove_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());
                });
            }
            {
                let inner = inner.clone();
                scope.acquire("animation frame", move || {
                    let mut inner = inner.borrow_mut();
                    if let Some(id) = inner.frame_request.take() {
                        if let Some(window) = web_sys::window() {
                            let _ = window.cancel_animation_frame(id);
                        }
                    }
                    inner.paint_closure = None;
                });
            }
            {
                let inner = inner.clone();
                scope.acquire("image fetches", move || {
                    let mut inner = inner.borrow_mut();
                    inner.fetches.clear();
                    inner.retired.clear();
                });
            }

            for request in &requests {
                start_fetch(&inner, request);
            }

            Ok(Self { inner, scope })
        }

        /// Called with the loading state after every completion.
        pub fn on_progress(&self, callback: impl FnMut(PreloadState) + 'static) {
            self.inner.borrow_mut().on_progress = Some(Box::new(callback));
        }

        /// Called with the overlay style whenever progress changes.
        pub fn on_overlay(&self, callback: impl FnMut(OverlayStyle) + 'static) {
            self.inner.borrow_mut().on_overlay = Some(Box::new(callback));
        }

        /// Called after a resize; returns the new start of the pinned region.
        pub fn on_range_refresh(&self, callback: impl FnMut() -> f64 + 'static) {
            self.inner.borrow_mut().on_refresh = Some(Box::new(callback));
        }

        /// Feed the page scroll offset.
        pub fn scroll_to(&self, scroll_y: f64) {
            let progress = self.inner.borrow().range.progress_at(scroll_y);
            self.set_progress(progress);
        }

        /// Feed a progress value from an external scroll source.
        pub fn set_progress(&self, progress: f64) {
            let mut inner = self.inner.borrow_mut();
            let displayed = inner.smoother.set_target(progress);
            apply_progress(&mut inner, displayed);
            if !inner.smoother.is_settled() {
                request_frame(&mut inner);
            }
        }

        pub fn preload_state(&self) -> PreloadState {
            self.inner.borrow().player.preload_state()
        }

        pub fn pinned_range(&self) -> PinnedRange {
            self.inner.borrow().range
        }

        /// Detach from the page.
        pub fn unmount(&mut self) {
            self.inner.borrow_mut().player.unmount();
            self.scope.dispose();
        }
    }

    impl Drop for WebPlayer {
        fn drop(&mut self) {
            self.unmount();
        }
    }

    fn apply_progress(inner: &mut Inner, progress: f64) {
        let update = inner.player.scroll_progress(progress);
        if inner.player.preload_state().is_loaded {
            if let Some(cb) = inner.on_overlay.as_mut() {
                cb(update.overlay);
            }
        }
        if update.request_paint {
            request_frame(inner);
        }
    }

    fn request_frame(inner: &mut Inner) {
        if inner.frame_request.is_some() {
            return;
        }
        let Some(closure) = inner.paint_closure.as_ref() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
                Ok(id) => inner.frame_request = Some(id),
                Err(_) => tracing::warn!("requestAnimationFrame failed"),
            }
        }
    }

    fn on_animation_frame(weak: &Weak<RefCell<Inner>>, timestamp: f64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        inner.frame_request = None;

        let dt = inner
            .last_paint_ms
            .map(|last| ((timestamp - last) / 1000.0).max(0.0))
            .unwrap_or(0.0);
        inner.last_paint_ms = Some(timestamp);

        if !inner.smoother.is_settled() {
            let displayed = inner.smoother.advance(dt);
            apply_progress(&mut inner, displayed);
        }
        if let Err(err) = inner.player.paint() {
            tracing::warn!(%err, "paint failed");
        }
        if inner.smoother.is_settled() {
            inner.last_paint_ms = None;
        } else {
            request_frame(&mut inner);
        }
    }

    fn on_resize(weak: &Weak<RefCell<Inner>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let Some(window) = web_sys::window() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        let refresh_range = match inner.player.resize(current_viewport(&window)) {
            Ok(outcome) => outcome.refresh_range,
            Err(err) => {
                tracing::warn!(%err, "resize failed");
                // Layout changed regardless of the canvas
                true
            }
        };
        if refresh_range {
            if let Some(refresh) = inner.on_refresh.as_mut() {
                let start = refresh();
                inner.range.refresh(start);
            }
        }
    }

    fn start_fetch(inner: &Rc<RefCell<Inner>>, request: &FrameRequest) {
        let weak = Rc::downgrade(inner);
        let index = request.index;
        let report = move |event: ImageEvent| on_image_event(&weak, index, event);
        match ImageFetch::start(request, report) {
            Ok(fetch) => {
                inner.borrow_mut().fetches.insert(index, fetch);
            }
            Err(reason) => {
                // Creating the element failed; count it as a failed attempt
                let outcome = inner.borrow_mut().player.frame_failed(index, &reason);
                handle_outcome(inner, outcome);
            }
        }
    }

    fn on_image_event(weak: &Weak<RefCell<Inner>>, index: usize, event: ImageEvent) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let (outcome, released) = {
            let mut guard = inner.borrow_mut();
            // Fetches retired by earlier events are no longer running
            let released = std::mem::take(&mut guard.retired);
            if let Some(finished) = guard.fetches.remove(&index) {
                guard.retired.push(finished);
            }
            let outcome = match event {
                ImageEvent::Loaded(image) => {
                    let (w, h) = (image.natural_width(), image.natural_height());
                    guard.player.frame_loaded(index, image, w, h)
                }
                ImageEvent::Failed(reason) => guard.player.frame_failed(index, &reason),
            };
            (outcome, released)
        };
        drop(released);
        handle_outcome(&inner, outcome);
    }

    fn handle_outcome(inner: &Rc<RefCell<Inner>>, outcome: PlayerResult<LoadOutcome>) {
        match outcome {
            Ok(LoadOutcome::Retry(request)) => start_fetch(inner, &request),
            Ok(LoadOutcome::Ignored) => {}
            Ok(_) => {
                let mut guard = inner.borrow_mut();
                let state = guard.player.preload_state();
                if let Some(cb) = guard.on_progress.as_mut() {
                    cb(state);
                }
            }
            Err(err) => tracing::warn!(%err, "frame handling failed"),
        }
    }
}
