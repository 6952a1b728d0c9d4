//! Stateless ball physics.
//!
//! Each function takes the entities it touches and nothing else. Motion is a
//! fixed-step Euler integration: one call to [`advance_ball`] is one tick's
//! worth of displacement regardless of how much wall-clock time passed.

use crate::{Ball, Player, Side, BALL_SPEED_DELTA};
use std::f32::consts::FRAC_PI_4;

/// Moves the ball by one tick of velocity.
pub fn advance_ball(ball: &mut Ball) {
    ball.x += ball.velocity_x;
    ball.y += ball.velocity_y;
}

/// Flips the vertical velocity if the ball pokes past the top or bottom edge.
///
/// Side edges are scoring boundaries and are never reflected here.
pub fn reflect_off_walls(ball: &mut Ball, bounds_height: f32) {
    if ball.y - ball.radius < 0.0 || ball.y + ball.radius > bounds_height {
        ball.velocity_y = -ball.velocity_y;
    }
}

/// Axis-aligned overlap between the ball's bounding square and a paddle.
///
/// Touching edges do not count as a hit.
pub fn collides(ball: &Ball, paddle: &Player) -> bool {
    let (b_left, b_top, b_right, b_bottom) = ball.get_bounds();
    let (p_left, p_top, p_right, p_bottom) = paddle.get_bounds();

    b_right > p_left && b_bottom > p_top && b_left < p_right && b_top < p_bottom
}

/// Recomputes the ball velocity after it strikes `paddle`.
///
/// The impact offset from the paddle center is normalized by half the paddle
/// height and scaled to at most a quarter turn either way. The offset is not
/// clamped: a ball clipping a paddle corner leaves at a steeper angle. The
/// ball speeds up by [`BALL_SPEED_DELTA`] on every hit.
pub fn deflect(ball: &mut Ball, paddle: &Player, side_sign: f32) {
    let half_height = paddle.height / 2.0;
    let offset = (ball.y - paddle.center_y()) / half_height;
    let angle = offset * FRAC_PI_4;

    ball.velocity_x = side_sign * ball.speed * angle.cos();
    ball.velocity_y = ball.speed * angle.sin();
    ball.speed += BALL_SPEED_DELTA;
}

/// The side whose paddle the ball is currently heading into.
pub fn approached_side(ball: &Ball, arena_width: f32) -> Side {
    if ball.x < arena_width / 2.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Horizontal direction a paddle on `side` sends the ball.
pub fn bounce_sign(side: Side) -> f32 {
    match side {
        Side::Left => 1.0,
        Side::Right => -1.0,
    }
}

/// The side edge the ball has crossed, if any.
pub fn exit_side(ball: &Ball, arena_width: f32) -> Option<Side> {
    if ball.x - ball.radius < 0.0 {
        Some(Side::Left)
    } else if ball.x + ball.radius > arena_width {
        Some(Side::Right)
    } else {
        None
    }
}

/// Horizontal serve direction after a point: back the way the ball came.
pub fn return_direction(ball: &Ball) -> f32 {
    if ball.velocity_x > 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, BALL_SPEED, CANVAS_HEIGHT, CANVAS_WIDTH, PADDLE_HEIGHT};
    use assert_approx_eq::assert_approx_eq;

    fn ball_at(x: f32, y: f32, vx: f32, vy: f32) -> Ball {
        let mut ball = Ball::serve(&Arena::default(), 1.0, 1.0);
        ball.x = x;
        ball.y = y;
        ball.velocity_x = vx;
        ball.velocity_y = vy;
        ball
    }

    #[test]
    fn test_advance_ball_is_euler_step() {
        let mut ball = ball_at(100.0, 100.0, 3.0, -2.0);
        advance_ball(&mut ball);
        assert_eq!(ball.x, 103.0);
        assert_eq!(ball.y, 98.0);
        assert_eq!(ball.speed, BALL_SPEED);
    }

    #[test]
    fn test_reflect_off_top_wall() {
        let mut ball = ball_at(300.0, 5.0, 5.0, -5.0);
        let before = ball.clone();
        reflect_off_walls(&mut ball, CANVAS_HEIGHT);

        assert_eq!(ball.velocity_y, 5.0);
        assert_eq!(ball.x, before.x);
        assert_eq!(ball.y, before.y);
        assert_eq!(ball.velocity_x, before.velocity_x);
        assert_eq!(ball.speed, before.speed);
    }

    #[test]
    fn test_reflect_off_bottom_wall() {
        let mut ball = ball_at(300.0, CANVAS_HEIGHT - 5.0, 5.0, 5.0);
        reflect_off_walls(&mut ball, CANVAS_HEIGHT);
        assert_eq!(ball.velocity_y, -5.0);
    }

    #[test]
    fn test_no_reflection_inside_field() {
        let mut ball = ball_at(300.0, 200.0, 5.0, 5.0);
        reflect_off_walls(&mut ball, CANVAS_HEIGHT);
        assert_eq!(ball.velocity_y, 5.0);
    }

    #[test]
    fn test_side_walls_do_not_reflect() {
        let mut ball = ball_at(-20.0, 200.0, -5.0, 5.0);
        reflect_off_walls(&mut ball, CANVAS_HEIGHT);
        assert_eq!(ball.velocity_x, -5.0);
        assert_eq!(ball.velocity_y, 5.0);
    }

    #[test]
    fn test_collision_detection_overlap() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        let ball = ball_at(25.0, paddle.center_y(), -5.0, 0.0);
        assert!(collides(&ball, &paddle));
    }

    #[test]
    fn test_collision_detection_no_collision() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        let ball = ball_at(300.0, 200.0, -5.0, 0.0);
        assert!(!collides(&ball, &paddle));
    }

    #[test]
    fn test_collision_detection_exact_touch() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        // Ball's left edge exactly on the paddle's right edge.
        let ball = ball_at(30.0, paddle.center_y(), -5.0, 0.0);
        assert!(!collides(&ball, &paddle));
    }

    #[test]
    fn test_collision_detection_above_paddle() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        let ball = ball_at(10.0, paddle.y - 15.0, -5.0, 0.0);
        assert!(!collides(&ball, &paddle));
    }

    #[test]
    fn test_deflect_center_hit_goes_straight() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        let mut ball = ball_at(25.0, paddle.center_y(), -5.0, 3.0);
        deflect(&mut ball, &paddle, bounce_sign(Side::Left));

        assert_approx_eq!(ball.velocity_x, BALL_SPEED);
        assert_approx_eq!(ball.velocity_y, 0.0);
        assert_approx_eq!(ball.speed, BALL_SPEED + BALL_SPEED_DELTA);
    }

    #[test]
    fn test_deflect_edge_hit_uses_quarter_turn() {
        let paddle = Player::new(2, Side::Right, &Arena::default());
        let mut ball = ball_at(
            CANVAS_WIDTH - 25.0,
            paddle.y + PADDLE_HEIGHT,
            5.0,
            0.0,
        );
        deflect(&mut ball, &paddle, bounce_sign(Side::Right));

        let component = BALL_SPEED * FRAC_PI_4.cos();
        assert_approx_eq!(ball.velocity_x, -component);
        assert_approx_eq!(ball.velocity_y, component);
        assert!(ball.velocity_x < 0.0);
    }

    #[test]
    fn test_deflect_offset_is_unclamped() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        // Center 5 units above the paddle top: offset is -1.1.
        let mut ball = ball_at(15.0, paddle.y - 5.0, -5.0, 0.0);
        deflect(&mut ball, &paddle, 1.0);

        let angle = -1.1 * FRAC_PI_4;
        assert_approx_eq!(ball.velocity_x, BALL_SPEED * angle.cos(), 1e-4);
        assert_approx_eq!(ball.velocity_y, BALL_SPEED * angle.sin(), 1e-4);
    }

    #[test]
    fn test_deflect_always_accelerates() {
        let paddle = Player::new(1, Side::Left, &Arena::default());
        let mut ball = ball_at(25.0, paddle.center_y(), -5.0, 0.0);

        for hit in 1..=4 {
            let before = ball.speed;
            deflect(&mut ball, &paddle, 1.0);
            assert_eq!(ball.speed, before + BALL_SPEED_DELTA);
            assert_approx_eq!(ball.speed, BALL_SPEED + hit as f32 * BALL_SPEED_DELTA);
        }
    }

    #[test]
    fn test_approached_side() {
        let left = ball_at(CANVAS_WIDTH / 2.0 - 1.0, 200.0, 5.0, 0.0);
        let mid = ball_at(CANVAS_WIDTH / 2.0, 200.0, -5.0, 0.0);
        assert_eq!(approached_side(&left, CANVAS_WIDTH), Side::Left);
        assert_eq!(approached_side(&mid, CANVAS_WIDTH), Side::Right);
    }

    #[test]
    fn test_exit_side() {
        assert_eq!(exit_side(&ball_at(5.0, 200.0, -5.0, 0.0), CANVAS_WIDTH), Some(Side::Left));
        assert_eq!(
            exit_side(&ball_at(CANVAS_WIDTH - 5.0, 200.0, 5.0, 0.0), CANVAS_WIDTH),
            Some(Side::Right)
        );
        assert_eq!(exit_side(&ball_at(10.0, 200.0, -5.0, 0.0), CANVAS_WIDTH), None);
    }

    #[test]
    fn test_return_direction() {
        assert_eq!(return_direction(&ball_at(0.0, 0.0, -5.0, 0.0)), 1.0);
        assert_eq!(return_direction(&ball_at(0.0, 0.0, 5.0, 0.0)), -1.0);
    }
}
