//! Keysym normalization and filtering for password entry.

use xkbcommon::xkb::Keysym;

/// Maps keypad variants onto their main-keyboard equivalents, so that
/// numeric-keypad entry behaves identically to the main keys.
pub fn normalize(sym: Keysym) -> Keysym {
    if sym == Keysym::KP_Enter {
        return Keysym::Return;
    }

    let raw = sym.raw();
    if (Keysym::KP_0.raw()..=Keysym::KP_9.raw()).contains(&raw) {
        return Keysym::new(raw - Keysym::KP_0.raw() + Keysym::_0.raw());
    }

    sym
}

/// Whether a keysym belongs to one of the categories that never contribute
/// to the password: function keys, keypad keys, miscellaneous function
/// keys, PF keys, and private vendor keypad keys.
///
/// Call this on the output of [`normalize`]: keypad Enter and digits must
/// be mapped to their main-keyboard syms first, otherwise the keypad
/// filter would swallow them.
pub fn is_ignored(sym: Keysym) -> bool {
    is_function_key(sym)
        || is_keypad_key(sym)
        || is_misc_function_key(sym)
        || is_pf_key(sym)
        || is_private_keypad_key(sym)
}

// The ranges below mirror Xlib's IsFunctionKey, IsKeypadKey,
// IsMiscFunctionKey, IsPFKey and IsPrivateKeypadKey; xkbcommon has no
// equivalent classifiers.

fn is_function_key(sym: Keysym) -> bool {
    (Keysym::F1.raw()..=Keysym::F35.raw()).contains(&sym.raw())
}

fn is_keypad_key(sym: Keysym) -> bool {
    (Keysym::KP_Space.raw()..=Keysym::KP_Equal.raw()).contains(&sym.raw())
}

fn is_misc_function_key(sym: Keysym) -> bool {
    (Keysym::Select.raw()..=Keysym::Break.raw()).contains(&sym.raw())
}

fn is_pf_key(sym: Keysym) -> bool {
    (Keysym::KP_F1.raw()..=Keysym::KP_F4.raw()).contains(&sym.raw())
}

fn is_private_keypad_key(sym: Keysym) -> bool {
    (0x1100_0000..=0x1100_ffff).contains(&sym.raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_enter_becomes_return() {
        assert_eq!(normalize(Keysym::KP_Enter), Keysym::Return);
    }

    #[test]
    fn keypad_digits_become_digits() {
        assert_eq!(normalize(Keysym::KP_0), Keysym::_0);
        assert_eq!(normalize(Keysym::KP_5), Keysym::_5);
        assert_eq!(normalize(Keysym::KP_9), Keysym::_9);
    }

    #[test]
    fn other_syms_pass_through() {
        assert_eq!(normalize(Keysym::a), Keysym::a);
        assert_eq!(normalize(Keysym::Escape), Keysym::Escape);
        assert_eq!(normalize(Keysym::KP_Add), Keysym::KP_Add);
    }

    #[test]
    fn normalized_keypad_entry_is_not_filtered() {
        // Normalization must come first; the raw keypad syms would be
        // swallowed by the keypad filter.
        assert!(is_ignored(Keysym::KP_Enter));
        assert!(!is_ignored(normalize(Keysym::KP_Enter)));
        assert!(is_ignored(Keysym::KP_7));
        assert!(!is_ignored(normalize(Keysym::KP_7)));
    }

    #[test]
    fn special_categories_are_ignored() {
        assert!(is_ignored(Keysym::F1));
        assert!(is_ignored(Keysym::F35));
        assert!(is_ignored(Keysym::KP_Space));
        assert!(is_ignored(Keysym::KP_Add));
        assert!(is_ignored(Keysym::KP_Equal));
        assert!(is_ignored(Keysym::Select));
        assert!(is_ignored(Keysym::Break));
        assert!(is_ignored(Keysym::KP_F1));
        assert!(is_ignored(Keysym::new(0x1100_0000)));
        assert!(is_ignored(Keysym::new(0x1100_ffff)));
    }

    #[test]
    fn entry_keys_are_not_ignored() {
        assert!(!is_ignored(Keysym::Return));
        assert!(!is_ignored(Keysym::Escape));
        assert!(!is_ignored(Keysym::BackSpace));
        assert!(!is_ignored(Keysym::a));
        assert!(!is_ignored(Keysym::_0));
        assert!(!is_ignored(Keysym::space));
    }
}
