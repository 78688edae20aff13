//! Built-in sample levels, inserted idempotently at startup.
//!
//! These guarantee the game is playable even without an external TOML bank.
//! Seeding never overwrites an existing (language, level_number) pair, so
//! restarting the server does not duplicate or reset level content.

use crate::domain::LevelSeed;

/// Minimal set of built-in levels covering HTML, CSS, and JavaScript.
pub fn seed_levels() -> Vec<LevelSeed> {
  vec![
    // HTML
    LevelSeed {
      language: "html".into(),
      level_number: 1,
      title: "Hello World".into(),
      description: "Create your first HTML page with a heading".into(),
      challenge: "Create an HTML page with an <h1> heading that says \"Hello World\"".into(),
      solution: "<h1>Hello World</h1>".into(),
      hint: Some("Use the h1 tag to create a main heading".into()),
      points: 10,
    },
    LevelSeed {
      language: "html".into(),
      level_number: 2,
      title: "Basic Structure".into(),
      description: "Learn the basic HTML document structure".into(),
      challenge: "Create a complete HTML document with html, head, title, and body tags".into(),
      solution: "<!DOCTYPE html>\n<html>\n<head>\n<title>My Page</title>\n</head>\n<body>\n<h1>Welcome</h1>\n</body>\n</html>".into(),
      hint: Some("Every HTML document needs DOCTYPE, html, head, and body tags".into()),
      points: 15,
    },
    // CSS
    LevelSeed {
      language: "css".into(),
      level_number: 1,
      title: "Color the World".into(),
      description: "Learn to change text colors in CSS".into(),
      challenge: "Make the text color red using CSS".into(),
      solution: "color: red;".into(),
      hint: Some("Use the color property to change text color".into()),
      points: 10,
    },
    LevelSeed {
      language: "css".into(),
      level_number: 2,
      title: "Size Matters".into(),
      description: "Learn to change font sizes".into(),
      challenge: "Make the text size 24px using CSS".into(),
      solution: "font-size: 24px;".into(),
      hint: Some("Use the font-size property to change text size".into()),
      points: 15,
    },
    // JavaScript
    LevelSeed {
      language: "javascript".into(),
      level_number: 1,
      title: "First Function".into(),
      description: "Create your first JavaScript function".into(),
      challenge: "Create a function called greet that returns \"Hello!\"".into(),
      solution: "function greet() {\n  return \"Hello!\";\n}".into(),
      hint: Some("Use the function keyword to create a function".into()),
      points: 20,
    },
    LevelSeed {
      language: "javascript".into(),
      level_number: 2,
      title: "Variable Adventure".into(),
      description: "Learn to create and use variables".into(),
      challenge: "Create a variable called name with the value \"Player\"".into(),
      solution: "let name = \"Player\";".into(),
      hint: Some("Use let to declare a variable".into()),
      points: 15,
    },
  ]
}
