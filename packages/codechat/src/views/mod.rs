mod index;

pub use index::index_page;

use maud::{Markup, html};

// Contact sidebar ("explorer"), filled in by the page script
pub fn sidebar() -> Markup {
    html! {
        aside id="sidebar" class="sidebar" {
            div class="sidebar-title" { "EXPLORER" }
            div class="sidebar-section" { "CHATS" }
            ul id="contact-list" class="contact-list" {
                li class="contact-empty" { "Waiting for login..." }
            }
        }
    }
}

// Shared CSS constant
pub const CSS: &str = r#"
    * { box-sizing: border-box; }

    body {
        margin: 0;
        height: 100vh;
        display: flex;
        flex-direction: column;
        background: #1e1e1e;
        color: #d4d4d4;
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
        font-size: 13px;
        overflow: hidden;
    }

    .titlebar {
        height: 30px;
        background: #3c3c3c;
        display: flex;
        align-items: center;
        justify-content: center;
        color: #cccccc;
        flex-shrink: 0;
    }

    .workbench { flex: 1; display: flex; min-height: 0; }

    .activity-bar {
        width: 48px;
        background: #333333;
        display: flex;
        flex-direction: column;
        align-items: center;
        padding-top: 8px;
        gap: 16px;
        color: #858585;
        font-size: 20px;
    }

    .activity-bar .active { color: #ffffff; }

    .sidebar {
        width: 260px;
        background: #252526;
        display: flex;
        flex-direction: column;
        flex-shrink: 0;
    }

    .sidebar-title { padding: 10px 20px; font-size: 11px; color: #bbbbbb; }
    .sidebar-section { padding: 4px 12px; font-size: 11px; font-weight: bold; }

    .contact-list { list-style: none; margin: 0; padding: 0; overflow-y: auto; flex: 1; }

    .contact {
        display: flex;
        align-items: center;
        gap: 6px;
        padding: 3px 20px;
        cursor: pointer;
        white-space: nowrap;
    }

    .contact:hover { background: #2a2d2e; }
    .contact.active { background: #37373d; }
    .contact-icon { color: #cbcb41; font-size: 10px; font-weight: bold; width: 16px; }
    .contact-name { overflow: hidden; text-overflow: ellipsis; flex: 1; }
    .contact-empty { padding: 3px 20px; color: #858585; font-style: italic; }

    .contact-unread {
        background: #0e639c;
        color: #ffffff;
        border-radius: 8px;
        padding: 0 6px;
        font-size: 11px;
    }

    .editor { flex: 1; display: flex; flex-direction: column; min-width: 0; }

    .tabs { display: flex; background: #252526; height: 35px; overflow-x: auto; flex-shrink: 0; }

    .tab {
        display: flex;
        align-items: center;
        gap: 8px;
        padding: 0 12px;
        background: #2d2d2d;
        color: #969696;
        border-right: 1px solid #252526;
        cursor: pointer;
        white-space: nowrap;
    }

    .tab.active { background: #1e1e1e; color: #ffffff; }
    .tab-close { opacity: 0.6; }
    .tab-close:hover { opacity: 1; }

    .transcript {
        flex: 1;
        margin: 0;
        padding: 8px 16px;
        background: #1e1e1e;
        color: #ce9178;
        border: none;
        resize: none;
        outline: none;
        font-family: 'SF Mono', Monaco, 'Cascadia Code', 'Roboto Mono', monospace;
        font-size: 14px;
        tab-size: 4;
        white-space: pre;
    }

    .panel { height: 160px; border-top: 1px solid #414141; display: flex; flex-direction: column; flex-shrink: 0; }
    .panel-title { padding: 6px 12px; font-size: 11px; color: #e7e7e7; }

    .terminal-line {
        display: flex;
        align-items: center;
        padding: 0 12px;
        font-family: 'SF Mono', Monaco, 'Cascadia Code', 'Roboto Mono', monospace;
    }

    .terminal-prompt { color: #23d18b; margin-right: 6px; }

    .terminal-input {
        flex: 1;
        background: transparent;
        border: none;
        outline: none;
        color: #d4d4d4;
        font: inherit;
    }

    .statusbar {
        height: 22px;
        background: #007acc;
        color: #ffffff;
        display: flex;
        align-items: center;
        justify-content: space-between;
        padding: 0 10px;
        font-size: 12px;
        flex-shrink: 0;
    }

    .modal {
        position: fixed;
        inset: 0;
        background: rgba(0, 0, 0, 0.6);
        display: none;
        align-items: center;
        justify-content: center;
    }

    .modal.visible { display: flex; }

    .modal-card {
        background: #252526;
        padding: 24px;
        border-radius: 6px;
        text-align: center;
    }

    .modal-card img { background: #ffffff; width: 256px; height: 256px; }
"#;
