//! On-screen modal handles.
//!
//! Rendering is the host's business. The orchestration layer only opens a
//! modal and later closes it through its handle.

/// An open modal.
pub trait ModalHandle: Send + 'static {
    /// Close the modal. Consumes the handle.
    fn close(self: Box<Self>);
}

/// Opens the modals used during connection.
pub trait ModalFactory: Send + Sync + 'static {
    /// Show a scannable code holding `link`.
    fn install_modal(&self, link: &str) -> Box<dyn ModalHandle>;

    /// Show a "waiting for approval in the wallet" notice.
    fn pending_modal(&self) -> Box<dyn ModalHandle>;
}
