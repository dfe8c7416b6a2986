use crate::view::View;

/// Fired after a view has rendered, once per render.
#[derive(Debug, Clone, Copy)]
pub struct ViewRendered<'a> {
    pub view: &'a View,
    pub output: &'a str,
}

/// Receives [`ViewRendered`] events.
///
/// Implemented for every `Fn(&ViewRendered<'_>)`.
pub trait RenderObserver: Send + Sync {
    fn view_rendered(&self, event: &ViewRendered<'_>);
}

impl<F> RenderObserver for F
    where F: Fn(&ViewRendered<'_>) + Send + Sync
{
    #[inline(always)]
    fn view_rendered(&self, event: &ViewRendered<'_>) {
        self(event)
    }
}
