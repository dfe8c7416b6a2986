use std::path::PathBuf;

xflags::xflags! {
    /// Render one view of a flat-file site to standard output.
    cmd quill {
        /// The site's directory.
        required site: PathBuf
        /// The template to render, such as `posts.show`.
        required view: String
        /// Wrap the rendered template in this layout.
        optional -l, --layout layout: String
        /// Set a view variable. Values are read as JSON, or else as text.
        repeated -s, --set pair: String
        /// Render the view about an asset, given as `container::path`.
        optional -a, --asset id: String
        /// List every asset instead of rendering.
        optional --list
    }
}
